//! Message sealing using `XChaCha20-Poly1305`
//!
//! All functions are pure - key and nonce bytes must be provided by the
//! caller. Production callers draw both from a CSPRNG for every record.

use std::fmt;

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroize;

use crate::error::{CodecError, Field};

/// `XChaCha20-Poly1305` key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// `XChaCha20` extended nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// A sealed message: ciphertext plus everything needed to open it.
///
/// Fields are plain byte vectors so records that did not come from [`seal`]
/// (truncated, emptied, corrupted) can still be represented and rejected by
/// [`unseal`].
#[derive(Clone, PartialEq, Eq)]
pub struct SealedMessage {
    /// Ciphertext including the 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
    /// The 24-byte `XChaCha20` nonce
    pub nonce: Vec<u8>,
    /// The 32-byte key this message was sealed under
    pub key: Vec<u8>,
}

impl SealedMessage {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }
}

impl fmt::Debug for SealedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedMessage")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("nonce_len", &self.nonce.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

// Key material is zeroized when the record is dropped
impl Drop for SealedMessage {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Seal a plaintext using `XChaCha20-Poly1305`.
///
/// # Security
///
/// - Caller MUST provide a fresh random key and nonce for every call
/// - The key is copied into the returned record
pub fn seal(plaintext: &str, key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE]) -> SealedMessage {
    let cipher = XChaCha20Poly1305::new(key.into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), plaintext.as_bytes()) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    debug_assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

    SealedMessage { ciphertext, nonce: nonce.to_vec(), key: key.to_vec() }
}

/// Open a sealed message.
///
/// Returns the original plaintext.
///
/// # Errors
///
/// - `MissingField`: ciphertext, nonce or key is empty
/// - `InvalidLength`: nonce or key has the wrong size
/// - `CiphertextTooShort`: ciphertext is shorter than the tag
/// - `AuthenticationFailed`: any field was altered after sealing
/// - `InvalidUtf8`: authenticated payload is not text
pub fn unseal(sealed: &SealedMessage) -> Result<String, CodecError> {
    for (bytes, field) in [
        (&sealed.ciphertext, Field::Ciphertext),
        (&sealed.nonce, Field::Nonce),
        (&sealed.key, Field::Key),
    ] {
        if bytes.is_empty() {
            return Err(CodecError::MissingField(field));
        }
    }

    let key: &[u8; KEY_SIZE] = exact(&sealed.key, Field::Key)?;
    let nonce: &[u8; NONCE_SIZE] = exact(&sealed.nonce, Field::Nonce)?;

    if sealed.ciphertext.len() < TAG_SIZE {
        return Err(CodecError::CiphertextTooShort { len: sealed.ciphertext.len() });
    }

    let cipher = XChaCha20Poly1305::new(key.into());
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CodecError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CodecError::InvalidUtf8)
}

fn exact<const N: usize>(bytes: &[u8], field: Field) -> Result<&[u8; N], CodecError> {
    bytes.try_into().map_err(|_| CodecError::InvalidLength { field, expected: N, got: bytes.len() })
}
