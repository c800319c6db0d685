//! Fuzz target for decrypt_message
//!
//! Feeds arbitrary text, and arbitrary bytes wrapped in valid base64, to the
//! decoder to find:
//! - Panics on short or unaligned input
//! - Slicing errors when splitting the IV
//! - Padding checks that accept out-of-range pad lengths
//!
//! The decoder should NEVER panic. Invalid input returns an error.

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::STANDARD};
use hushwire_crypto::{EncodedMessage, SessionKey, decrypt_message, encrypt_message};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    key: [u8; 32],
    text: String,
    wire: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let key = SessionKey::new(input.key);

    // Raw text straight off the transport
    let _ = decrypt_message(&EncodedMessage::new(input.text), &key);

    // Well-formed base64 so the cipher path is reached
    let wrapped = EncodedMessage::new(STANDARD.encode(&input.wire));
    if let Ok(plaintext) = decrypt_message(&wrapped, &key) {
        // Whatever decrypts must survive a re-encryption round trip
        let iv: [u8; 16] = input.wire[..16].try_into().unwrap();
        let again = encrypt_message(&plaintext, &key, iv);
        assert_eq!(decrypt_message(&again, &key).unwrap(), plaintext);
    }
});
