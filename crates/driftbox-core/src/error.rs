//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Decryption failures are not store errors: they are recovered inside
/// [`crate::MessageStore::drain_visible`] and reported in the drain result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store holds `max_records` live records and none could be swept.
    ///
    /// Only possible when a capacity bound is configured. Transient - records
    /// expire on their own.
    #[error("store is at capacity ({capacity} records)")]
    CapacityExceeded {
        /// Configured capacity
        capacity: usize,
    },
}
