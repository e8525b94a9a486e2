//! Driftbox Cryptographic Codec
//!
//! Seals a single relay message into an opaque record and opens it again.
//! Pure functions with deterministic outputs. Callers provide the key and
//! nonce bytes, which keeps the codec testable and leaves the choice of
//! entropy source to the environment.
//!
//! # Record Layout
//!
//! ```text
//! plaintext (UTF-8)
//!        │
//!        ▼
//! XChaCha20-Poly1305(key[32], nonce[24])
//!        │
//!        ▼
//! SealedMessage { ciphertext || tag[16], nonce, key }
//! ```
//!
//! # Security
//!
//! Every record carries its own freshly generated key, and that key is stored
//! next to the ciphertext and handed back to the submitter. Anyone holding a
//! record can open it. The AEAD tag still guarantees that a record is either
//! opened to exactly the plaintext that was sealed or rejected:
//!
//! - Flipped ciphertext, nonce or key bits -> authentication failure
//! - Missing or wrongly sized fields -> rejected before decryption
//! - Failures are values, never panics

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod error;

pub use codec::{KEY_SIZE, NONCE_SIZE, SealedMessage, TAG_SIZE, seal, unseal};
pub use error::{CodecError, Field};
