#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

//! Per-client rate limiting.
//!
//! In-memory sliding-window limiter keyed by source IP. Time comes from the
//! [`Environment`], so windows are testable on a virtual clock.
//!
//! # Memory Management
//!
//! Spoofed source addresses must not grow the table without bound:
//!
//! 1. **Periodic cleanup**: every `cleanup_interval` checks, IPs with no
//!    request inside the window are dropped.
//! 2. **Hard cap**: at most `max_tracked_ips` IPs are tracked. A new IP
//!    arriving at the cap forces a cleanup; if the table is still full the
//!    request is rejected.

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use driftbox_core::{env::Environment, saturating_millis};

use crate::relay::RelayError;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per IP within the window
    pub max_requests: u32,
    /// Sliding window length
    pub window: Duration,
    /// Run cleanup every N checks
    pub cleanup_interval: u64,
    /// Upper bound on tracked IPs
    pub max_tracked_ips: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // 100 requests per 15 minutes
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            cleanup_interval: 100,
            max_tracked_ips: 10_000,
        }
    }
}

/// Sliding-window rate limiter.
pub struct RateLimiter<E: Environment> {
    env: E,
    config: RateLimitConfig,
    // Request timestamps (ms since epoch) per IP
    state: Mutex<HashMap<IpAddr, Vec<u64>>>,
    request_count: AtomicU64,
}

impl<E: Environment> RateLimiter<E> {
    /// Create a limiter.
    pub fn new(env: E, config: RateLimitConfig) -> Self {
        Self { env, config, state: Mutex::new(HashMap::new()), request_count: AtomicU64::new(0) }
    }

    /// Record a request from `ip`, or reject it.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` when `ip` already made `max_requests` requests
    /// inside the window, or when `ip` is new and the tracking table is full.
    pub fn check(&self, ip: IpAddr) -> Result<(), RelayError> {
        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        let cleanup_due = count > 0 && count % self.config.cleanup_interval.max(1) == 0;

        let mut state = self.lock();
        let cutoff = self.cutoff();

        if cleanup_due {
            tracing::debug!(request_count = count, "running periodic rate limiter cleanup");
            Self::retain_recent(&mut state, cutoff);
        }

        if !state.contains_key(&ip) && state.len() >= self.config.max_tracked_ips {
            Self::retain_recent(&mut state, cutoff);

            if state.len() >= self.config.max_tracked_ips {
                tracing::warn!(
                    ip = %ip,
                    tracked_ips = state.len(),
                    "rejecting new IP: max tracked IPs reached"
                );
                return Err(RelayError::RateLimited);
            }
        }

        let timestamps = state.entry(ip).or_default();
        timestamps.retain(|&t| t > cutoff);

        if timestamps.len() >= self.config.max_requests as usize {
            tracing::warn!(
                ip = %ip,
                requests = timestamps.len(),
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return Err(RelayError::RateLimited);
        }

        timestamps.push(self.env.wall_clock_millis());

        Ok(())
    }

    /// Drop IPs with no request inside the window.
    pub fn cleanup(&self) {
        let mut state = self.lock();
        let cutoff = self.cutoff();
        Self::retain_recent(&mut state, cutoff);
    }

    /// Number of tracked IPs.
    ///
    /// Useful for monitoring and debugging.
    pub fn tracked_ips(&self) -> usize {
        self.lock().len()
    }

    fn cutoff(&self) -> u64 {
        self.env.wall_clock_millis().saturating_sub(saturating_millis(self.config.window))
    }

    fn retain_recent(state: &mut HashMap<IpAddr, Vec<u64>>, cutoff: u64) {
        state.retain(|_, timestamps| {
            timestamps.retain(|&t| t > cutoff);
            !timestamps.is_empty()
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, Vec<u64>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, sync::Arc};

    use super::*;

    #[derive(Clone)]
    struct ClockEnv {
        clock: Arc<AtomicU64>,
    }

    impl ClockEnv {
        fn new() -> Self {
            Self { clock: Arc::new(AtomicU64::new(1_000_000)) }
        }

        fn advance(&self, duration: Duration) {
            self.clock.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl Environment for ClockEnv {
        fn wall_clock_millis(&self) -> u64 {
            self.clock.load(Ordering::SeqCst)
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    fn limiter(env: &ClockEnv, max_requests: u32) -> RateLimiter<ClockEnv> {
        let config = RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            ..RateLimitConfig::default()
        };
        RateLimiter::new(env.clone(), config)
    }

    #[test]
    fn allows_requests_within_limit() {
        let env = ClockEnv::new();
        let limiter = limiter(&env, 5);

        for _ in 0..5 {
            assert!(limiter.check(ip(1)).is_ok());
        }
    }

    #[test]
    fn rejects_when_limit_exceeded() {
        let env = ClockEnv::new();
        let limiter = limiter(&env, 3);

        for _ in 0..3 {
            assert!(limiter.check(ip(1)).is_ok());
        }

        assert_eq!(limiter.check(ip(1)), Err(RelayError::RateLimited));
    }

    #[test]
    fn different_ips_tracked_separately() {
        let env = ClockEnv::new();
        let limiter = limiter(&env, 2);

        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());

        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(2)).is_err());
    }

    #[test]
    fn window_expiration_restores_quota() {
        let env = ClockEnv::new();
        let limiter = limiter(&env, 2);

        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());

        env.advance(Duration::from_secs(61));

        assert!(limiter.check(ip(1)).is_ok());
    }

    #[test]
    fn cleanup_removes_idle_ips() {
        let env = ClockEnv::new();
        let limiter = limiter(&env, 10);

        for i in 0..5 {
            limiter.check(ip(i)).unwrap();
        }
        assert_eq!(limiter.tracked_ips(), 5);

        env.advance(Duration::from_secs(61));
        limiter.cleanup();

        assert_eq!(limiter.tracked_ips(), 0);
    }

    #[test]
    fn tracked_ip_cap_rejects_new_ips() {
        let env = ClockEnv::new();
        let config = RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
            cleanup_interval: 1_000,
            max_tracked_ips: 2,
        };
        let limiter = RateLimiter::new(env.clone(), config);

        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert_eq!(limiter.check(ip(3)), Err(RelayError::RateLimited));

        // Known IPs are unaffected by the cap
        assert!(limiter.check(ip(1)).is_ok());

        // Once the window passes, the cap frees up
        env.advance(Duration::from_secs(61));
        assert!(limiter.check(ip(3)).is_ok());
        assert_eq!(limiter.tracked_ips(), 1);
    }

    #[test]
    fn oversized_window_never_forgets_requests() {
        let env = ClockEnv::new();
        let config = RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(18_446_744_073_709_552),
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(env.clone(), config);

        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_ok());

        // A wrapped window would be under a second and restore the quota here
        env.advance(Duration::from_secs(1));
        assert_eq!(limiter.check(ip(1)), Err(RelayError::RateLimited));
    }

    #[test]
    fn default_config_matches_reference_policy() {
        let config = RateLimitConfig::default();

        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_secs(900));
    }
}
