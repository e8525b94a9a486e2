#![allow(clippy::disallowed_types, reason = "Synchronous RNG access only")]

//! Simulated environment with a virtual clock and seeded RNG.
//!
//! The clock only moves when a test advances it or when [`Environment::sleep`]
//! completes, in which case it moves by exactly the slept duration. Paired with
//! a paused Tokio runtime this makes background timers fully deterministic.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use driftbox_core::{env::Environment, saturating_millis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Default starting point of the virtual clock (2023-11-14T22:13:20Z).
pub const DEFAULT_START_MILLIS: u64 = 1_700_000_000_000;

/// Deterministic environment for tests.
///
/// Clones share the clock and the RNG stream.
#[derive(Clone)]
pub struct SimEnv {
    clock: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Create an environment seeded with `seed`, starting at
    /// [`DEFAULT_START_MILLIS`].
    pub fn with_seed(seed: u64) -> Self {
        Self::starting_at(DEFAULT_START_MILLIS, seed)
    }

    /// Create an environment whose clock starts at `millis`.
    pub fn starting_at(millis: u64, seed: u64) -> Self {
        Self {
            clock: Arc::new(AtomicU64::new(millis)),
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        self.clock.fetch_add(saturating_millis(duration), Ordering::SeqCst);
    }

    /// Set the virtual clock to an absolute value. May move it backwards.
    pub fn set_millis(&self, millis: u64) {
        self.clock.store(millis, Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    fn wall_clock_millis(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        let clock = Arc::clone(&self.clock);
        async move {
            tokio::time::sleep(duration).await;
            clock.fetch_add(saturating_millis(duration), Ordering::SeqCst);
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
