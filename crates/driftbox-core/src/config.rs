//! Store lifecycle configuration.

use std::time::Duration;

/// Maximum age of a record that has never been retrieved (6 hours).
pub const DEFAULT_UNSEEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Maximum age of a record after its first retrieval (10 minutes).
pub const DEFAULT_SEEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long an unseen record stays visible
    pub unseen_ttl: Duration,
    /// How long a seen record lingers before the sweeper removes it
    pub seen_ttl: Duration,
    /// Optional upper bound on stored records. `None` means unbounded.
    pub max_records: Option<usize>,
}

impl StoreConfig {
    pub(crate) fn unseen_ttl_millis(&self) -> u64 {
        saturating_millis(self.unseen_ttl)
    }

    pub(crate) fn seen_ttl_millis(&self) -> u64 {
        saturating_millis(self.seen_ttl)
    }
}

/// Whole milliseconds in `duration`, capped at `u64::MAX`.
///
/// Durations too long to represent behave as "never expires" instead of
/// wrapping around to a short TTL.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { unseen_ttl: DEFAULT_UNSEEN_TTL, seen_ttl: DEFAULT_SEEN_TTL, max_records: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttls() {
        let config = StoreConfig::default();

        assert_eq!(config.unseen_ttl_millis(), 6 * 60 * 60 * 1_000);
        assert_eq!(config.seen_ttl_millis(), 10 * 60 * 1_000);
        assert_eq!(config.max_records, None);
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_wrapping() {
        // 2^64 ms plus change: a plain `as u64` would wrap to 384 ms
        let config = StoreConfig {
            unseen_ttl: Duration::from_secs(18_446_744_073_709_552),
            seen_ttl: Duration::MAX,
            max_records: None,
        };

        assert_eq!(config.unseen_ttl_millis(), u64::MAX);
        assert_eq!(config.seen_ttl_millis(), u64::MAX);
    }

    #[test]
    fn saturating_millis_is_exact_in_range() {
        assert_eq!(saturating_millis(Duration::from_millis(1_234)), 1_234);
        assert_eq!(saturating_millis(Duration::from_millis(u64::MAX)), u64::MAX);
        assert_eq!(saturating_millis(Duration::ZERO), 0);
    }
}
