//! Fuzz target for decode_public_key
//!
//! Directory responses are untrusted. Arbitrary bytes are tried as PEM,
//! base64 and DER; the decoder should NEVER panic.

#![no_main]

use hushwire_crypto::{decode_public_key, encode_public_key_pem};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = decode_public_key(data) {
        // Any accepted key re-encodes and decodes to itself
        let pem = encode_public_key_pem(&key).unwrap();
        assert_eq!(decode_public_key(pem.as_bytes()).unwrap(), key);
    }
});
