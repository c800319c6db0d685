//! Session key agreement: P-384 ECDH followed by HKDF-SHA256.

use hkdf::Hkdf;
use p384::{PublicKey, SecretKey, ecdh::diffie_hellman};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::CryptoError;

/// Size of a derived session key (AES-256 key).
pub const SESSION_KEY_SIZE: usize = 32;

/// HKDF info parameter. Must stay empty for interoperability.
const SESSION_KEY_INFO: &[u8] = &[];

/// Symmetric key shared with one peer.
///
/// Derived once per peer and reused for every message with that peer.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Wrap raw key bytes.
    pub fn new(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Build a key from an arbitrary slice.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if `bytes` is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SESSION_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: SESSION_KEY_SIZE, actual: bytes.len() }
        })?;

        Ok(Self { key })
    }

    /// Raw key bytes for AES-256.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

// Zeroize key material on drop
impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the session key shared between `my_secret` and `their_public`.
///
/// 1. ECDH: shared secret = x-coordinate of `my_secret * their_public`
/// 2. HKDF-SHA256 with no salt and empty info, 32-byte output
///
/// # Security
///
/// - Symmetric: `derive(a, B) == derive(b, A)` for any two P-384 key pairs
/// - Deterministic: the same pair always yields the same key
/// - No validation against degenerate peer keys beyond what point decoding
///   enforces
pub fn derive_session_key(my_secret: &SecretKey, their_public: &PublicKey) -> SessionKey {
    let shared = diffie_hellman(my_secret.to_nonzero_scalar(), their_public.as_affine());

    // No salt: HKDF substitutes a zero-filled salt of hash length (RFC 5869)
    let hkdf = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes());

    let mut key = [0u8; SESSION_KEY_SIZE];
    let Ok(()) = hkdf.expand(SESSION_KEY_INFO, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    let session_key = SessionKey::new(key);
    key.zeroize();
    session_key
}
