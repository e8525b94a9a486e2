//! Stored record and its lifecycle.
//!
//! ```text
//! Created(unseen) ──drain──▶ Seen ──seen TTL──▶ Evicted
//!        │                                        ▲
//!        └──────────────unseen TTL────────────────┘
//! ```
//!
//! `Evicted` is implicit: the record is removed from the store and nothing
//! is retained.

use driftbox_crypto::SealedMessage;

use crate::config::StoreConfig;

/// Lifecycle state of a live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never retrieved
    Unseen,
    /// Processed by a retrieval at the given time (ms since epoch)
    Seen {
        /// When the record was first retrieved
        seen_at: u64,
    },
}

/// One sealed message plus its lifecycle timestamps.
pub(crate) struct StoredRecord {
    pub(crate) sealed: SealedMessage,
    pub(crate) received_at: u64,
    seen_at: Option<u64>,
}

impl StoredRecord {
    pub(crate) fn new(sealed: SealedMessage, received_at: u64) -> Self {
        Self { sealed, received_at, seen_at: None }
    }

    pub(crate) fn state(&self) -> RecordState {
        match self.seen_at {
            None => RecordState::Unseen,
            Some(seen_at) => RecordState::Seen { seen_at },
        }
    }

    /// Unseen and younger than the unseen TTL.
    pub(crate) fn is_visible(&self, now: u64, config: &StoreConfig) -> bool {
        self.seen_at.is_none() && now.saturating_sub(self.received_at) < config.unseen_ttl_millis()
    }

    /// Past whichever TTL applies to its current state.
    pub(crate) fn is_expired(&self, now: u64, config: &StoreConfig) -> bool {
        match self.seen_at {
            Some(seen_at) => now.saturating_sub(seen_at) >= config.seen_ttl_millis(),
            None => now.saturating_sub(self.received_at) >= config.unseen_ttl_millis(),
        }
    }

    /// Transition to `Seen`. No-op if already seen.
    pub(crate) fn mark_seen(&mut self, now: u64) {
        if self.seen_at.is_none() {
            // Clamp so seen_at >= received_at even if the wall clock stepped back
            self.seen_at = Some(now.max(self.received_at));
        }
    }
}

/// Plaintext-free view of a stored record.
///
/// Useful for debugging and testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Message ID (ms since epoch at append time)
    pub received_at: u64,
    /// Current lifecycle state
    pub state: RecordState,
    /// Length of the stored ciphertext
    pub ciphertext_len: usize,
}

impl From<&StoredRecord> for RecordSnapshot {
    fn from(record: &StoredRecord) -> Self {
        Self {
            received_at: record.received_at,
            state: record.state(),
            ciphertext_len: record.sealed.ciphertext.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use driftbox_crypto::{KEY_SIZE, NONCE_SIZE, seal};

    use super::*;

    const MINUTE: u64 = 60 * 1000;
    const HOUR: u64 = 60 * MINUTE;

    fn record_at(received_at: u64) -> StoredRecord {
        StoredRecord::new(seal("hi", &[7; KEY_SIZE], &[9; NONCE_SIZE]), received_at)
    }

    #[test]
    fn unseen_record_visible_until_unseen_ttl() {
        let config = StoreConfig::default();
        let record = record_at(HOUR);

        assert!(record.is_visible(HOUR, &config));
        assert!(record.is_visible(7 * HOUR - 1, &config));
        assert!(!record.is_visible(7 * HOUR, &config));
        assert!(record.is_expired(7 * HOUR, &config));
    }

    #[test]
    fn seen_record_is_never_visible() {
        let config = StoreConfig::default();
        let mut record = record_at(0);
        record.mark_seen(5);

        assert!(!record.is_visible(5, &config));
        assert!(!record.is_expired(5 + 10 * MINUTE - 1, &config));
        assert!(record.is_expired(5 + 10 * MINUTE, &config));
    }

    #[test]
    fn mark_seen_is_set_once() {
        let mut record = record_at(100);
        record.mark_seen(200);
        record.mark_seen(300);

        assert_eq!(record.state(), RecordState::Seen { seen_at: 200 });
    }

    #[test]
    fn mark_seen_clamps_backwards_clock() {
        let mut record = record_at(1_000);
        record.mark_seen(400);

        assert_eq!(record.state(), RecordState::Seen { seen_at: 1_000 });
    }

    #[test]
    fn backwards_clock_keeps_record_visible() {
        let config = StoreConfig::default();
        let record = record_at(10 * HOUR);

        assert!(record.is_visible(HOUR, &config));
        assert!(!record.is_expired(HOUR, &config));
    }
}
