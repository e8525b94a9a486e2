//! Fuzz target for seal/unseal round trips
//!
//! Any text sealed under any key and nonce must unseal to itself, and a single
//! flipped ciphertext bit must be rejected.

#![no_main]

use arbitrary::Arbitrary;
use driftbox_crypto::{KEY_SIZE, NONCE_SIZE, seal, unseal};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    key: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
    flip: u16,
}

fuzz_target!(|input: Input| {
    if input.text.is_empty() {
        return;
    }

    let mut sealed = seal(&input.text, &input.key, &input.nonce);
    assert_eq!(unseal(&sealed).as_deref(), Ok(input.text.as_str()));

    let bit = usize::from(input.flip) % (sealed.ciphertext.len() * 8);
    sealed.ciphertext[bit / 8] ^= 1 << (bit % 8);
    assert!(unseal(&sealed).is_err());
});
