//! Driftbox core: the ephemeral sealed-message store.
//!
//! Pure, synchronous lifecycle logic with no I/O. The store owns every sealed
//! record and enforces two independent expiry policies:
//!
//! - **Unseen TTL** (default 6h): a record nobody has retrieved is removed
//!   once it reaches this age
//! - **Seen TTL** (default 10m): a record is removed this long after the first
//!   retrieval that processed it
//!
//! Time and randomness come from an [`env::Environment`], so the same logic
//! runs against the system clock in production and a virtual clock in tests.
//!
//! # Components
//!
//! - [`MessageStore`]: mutex-guarded record collection (append, drain, sweep)
//! - [`StoreConfig`]: TTLs and optional capacity bound
//! - [`env::Environment`]: time, randomness and sleeping

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
mod error;
mod record;
mod store;

pub use config::{DEFAULT_SEEN_TTL, DEFAULT_UNSEEN_TTL, StoreConfig, saturating_millis};
pub use error::StoreError;
pub use record::{RecordSnapshot, RecordState};
pub use store::{DecryptFailure, Delivered, Drain, MessageStore, Receipt};
