//! Codec error types.
//!
//! Defines errors that can occur while opening a sealed record:
//! - `MissingField`: a record field is empty
//! - `InvalidLength`: nonce or key does not match the primitive's size
//! - `CiphertextTooShort`: ciphertext cannot even hold the tag
//! - `AuthenticationFailed`: tag check failed (tampered or mismatched fields)
//! - `InvalidUtf8`: decrypted bytes are not text

use std::fmt;

use thiserror::Error;

/// Field of a sealed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Encrypted payload including the authentication tag
    Ciphertext,
    /// AEAD nonce
    Nonce,
    /// Symmetric key
    Key,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ciphertext => f.write_str("ciphertext"),
            Self::Nonce => f.write_str("nonce"),
            Self::Key => f.write_str("key"),
        }
    }
}

/// Errors that can occur when unsealing a record.
///
/// None of these are fatal. Callers drop the record and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required field is empty
    #[error("missing {0}")]
    MissingField(Field),

    /// Nonce or key has the wrong size
    #[error("invalid {field} length: expected {expected}, got {got}")]
    InvalidLength {
        /// Field with the wrong size
        field: Field,
        /// Size required by the primitive
        expected: usize,
        /// Size that was provided
        got: usize,
    },

    /// Ciphertext is shorter than the authentication tag
    #[error("ciphertext too short: {len} bytes")]
    CiphertextTooShort {
        /// Provided ciphertext length
        len: usize,
    },

    /// Authentication tag did not verify
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Decrypted payload is not valid UTF-8
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_display() {
        let err = CodecError::MissingField(Field::Nonce);
        assert_eq!(err.to_string(), "missing nonce");

        let err = CodecError::InvalidLength { field: Field::Key, expected: 32, got: 31 };
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 31");

        let err = CodecError::CiphertextTooShort { len: 3 };
        assert_eq!(err.to_string(), "ciphertext too short: 3 bytes");
    }
}
