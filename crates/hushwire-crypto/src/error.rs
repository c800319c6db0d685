//! Cryptographic error types.
//!
//! Every failure a primitive can report:
//! - `InvalidKeyLength`: symmetric key material of the wrong size
//! - `MalformedInput`: an encoded message that cannot be a valid ciphertext
//! - `InvalidPadding`: PKCS#7 check failed (wrong key, corruption, tampering)
//! - `IncompatibleKey`: a well-formed public key for another curve/algorithm
//! - `MalformedKey`: key bytes that do not parse at all
//! - `GenerationFailed`: identity scalar outside the valid range

use thiserror::Error;

/// Errors produced by Hushwire cryptographic primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Symmetric key is not the expected size.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Encoded message is not decodable or too short to hold an IV.
    #[error("malformed input: {reason}")]
    MalformedInput {
        /// What was wrong with the input
        reason: String,
    },

    /// PKCS#7 padding was invalid after decryption.
    ///
    /// Caused by a wrong key, corrupted ciphertext or tampering. This is a
    /// probabilistic signal only: tampered ciphertext can still unpad
    /// correctly.
    #[error("invalid padding: wrong key or corrupted ciphertext")]
    InvalidPadding,

    /// Public key is well-formed but not a P-384 key.
    #[error("incompatible key: {reason}")]
    IncompatibleKey {
        /// Algorithm or curve that was found
        reason: String,
    },

    /// Key encoding could not be parsed.
    #[error("malformed key: {reason}")]
    MalformedKey {
        /// Parser error
        reason: String,
    },

    /// Identity key generation failed.
    #[error("key generation failed: {reason}")]
    GenerationFailed {
        /// Why the candidate scalar was rejected
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error concerns a single received message.
    ///
    /// Such errors must not terminate message processing: the message is
    /// reported as unreadable and the next one is handled normally.
    pub fn is_message_local(&self) -> bool {
        matches!(self, Self::MalformedInput { .. } | Self::InvalidPadding)
    }
}
