//! Fuzz target for unsealing stored records
//!
//! Feeds arbitrary ciphertext, nonce and key fields to `unseal`. Records in the
//! store are only ever produced by `seal`, but a corrupted record must surface
//! as a `CodecError`, never a panic.

#![no_main]

use arbitrary::Arbitrary;
use driftbox_crypto::{SealedMessage, unseal};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Record {
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    key: Vec<u8>,
}

fuzz_target!(|record: Record| {
    let sealed = SealedMessage { ciphertext: record.ciphertext, nonce: record.nonce, key: record.key };
    let _ = unseal(&sealed);
});
