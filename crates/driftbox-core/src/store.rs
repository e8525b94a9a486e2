#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

//! In-memory message store.
//!
//! Owns every sealed record for the lifetime of the process. All operations
//! take the same mutex for their full duration, so an eviction, unseal and
//! seen-marking pass inside [`MessageStore::drain_visible`] is atomic with
//! respect to concurrent appends, drains and sweeps. Two drains never return
//! the same record.
//!
//! The lock is never held across an `.await`; every operation is synchronous.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use driftbox_crypto::{CodecError, KEY_SIZE, NONCE_SIZE, SealedMessage, seal, unseal};
use zeroize::Zeroize;

use crate::{
    config::StoreConfig,
    env::Environment,
    error::StoreError,
    record::{RecordSnapshot, StoredRecord},
};

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// The sealed record as stored (including its key)
    pub sealed: SealedMessage,
    /// Message ID: wall-clock ms at append time
    pub received_at: u64,
}

/// A message returned by a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Decrypted text
    pub text: String,
    /// The record's `received_at`, used as an opaque identifier
    pub message_id: u64,
}

/// A record that was visible but could not be unsealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptFailure {
    /// The record's `received_at`
    pub message_id: u64,
    /// Why unsealing failed
    pub error: CodecError,
}

/// Outcome of [`MessageStore::drain_visible`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drain {
    /// Successfully unsealed messages, in insertion order
    pub messages: Vec<Delivered>,
    /// Records removed because they were no longer visible
    pub evicted: usize,
    /// Visible records that failed to unseal (marked seen, not returned)
    pub failures: Vec<DecryptFailure>,
}

impl Drain {
    /// True when no message was delivered.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Thread-safe store of sealed messages with two-TTL expiry.
///
/// Clones share the same underlying records, so the request handlers and the
/// background sweeper each hold a handle to one store.
///
/// # Invariants
///
/// - Records are kept in insertion order
/// - A record transitions unseen -> seen at most once
/// - `seen_at >= received_at` for every seen record
/// - A record is delivered by at most one drain
#[derive(Clone)]
pub struct MessageStore<E: Environment> {
    env: E,
    config: StoreConfig,
    records: Arc<Mutex<Vec<StoredRecord>>>,
}

impl<E: Environment> MessageStore<E> {
    /// Create an empty store.
    pub fn new(env: E, config: StoreConfig) -> Self {
        Self { env, config, records: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Seal `plaintext` under a fresh random key and nonce and append it.
    ///
    /// # Errors
    ///
    /// - `CapacityExceeded`: a capacity bound is configured, the store is full
    ///   and sweeping expired records freed nothing
    pub fn append(&self, plaintext: &str) -> Result<Receipt, StoreError> {
        let sealed = self.seal_fresh(plaintext);

        let mut records = self.lock();
        let now = self.env.wall_clock_millis();

        if let Some(capacity) = self.config.max_records {
            if records.len() >= capacity {
                Self::evict_expired(&mut records, now, &self.config);
            }
            if records.len() >= capacity {
                return Err(StoreError::CapacityExceeded { capacity });
            }
        }

        records.push(StoredRecord::new(sealed.clone(), now));

        Ok(Receipt { sealed, received_at: now })
    }

    /// Evict invisible records, unseal the rest, and mark them seen.
    ///
    /// Runs as one critical section:
    /// 1. Remove every record that is seen or older than the unseen TTL
    /// 2. Unseal each survivor in insertion order
    /// 3. Mark every survivor seen, including ones that failed to unseal
    ///
    /// An empty store yields an empty drain.
    pub fn drain_visible(&self) -> Drain {
        let mut records = self.lock();
        let now = self.env.wall_clock_millis();

        let before = records.len();
        records.retain(|record| record.is_visible(now, &self.config));

        let mut drain = Drain { evicted: before - records.len(), ..Drain::default() };

        for record in records.iter_mut() {
            match unseal(&record.sealed) {
                Ok(text) => {
                    drain.messages.push(Delivered { text, message_id: record.received_at });
                },
                Err(error) => {
                    drain.failures.push(DecryptFailure { message_id: record.received_at, error });
                },
            }
            record.mark_seen(now);
        }

        drain
    }

    /// Remove every record past its TTL. Returns the number removed.
    ///
    /// Idempotent: a second call at the same instant removes nothing.
    pub fn sweep(&self) -> usize {
        let mut records = self.lock();
        let now = self.env.wall_clock_millis();

        Self::evict_expired(&mut records, now, &self.config)
    }

    /// Number of live records (seen or unseen).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Lifecycle view of every record, in insertion order.
    pub fn snapshot(&self) -> Vec<RecordSnapshot> {
        self.lock().iter().map(RecordSnapshot::from).collect()
    }

    fn seal_fresh(&self, plaintext: &str) -> SealedMessage {
        let mut key = [0u8; KEY_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut key);
        self.env.random_bytes(&mut nonce);

        let sealed = seal(plaintext, &key, &nonce);
        key.zeroize();

        sealed
    }

    fn evict_expired(records: &mut Vec<StoredRecord>, now: u64, config: &StoreConfig) -> usize {
        let before = records.len();
        records.retain(|record| !record.is_expired(now, config));
        before - records.len()
    }

    // Every mutation leaves the vector consistent, so a poisoned lock is safe
    // to reuse.
    fn lock(&self) -> MutexGuard<'_, Vec<StoredRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn push_raw(&self, sealed: SealedMessage, received_at: u64) {
        self.lock().push(StoredRecord::new(sealed, received_at));
    }
}
