//! Long-term P-384 identity keys and their interchange encodings.
//!
//! Private keys are exchanged as PEM-encoded PKCS#8 (unencrypted). Public keys
//! are exchanged as SubjectPublicKeyInfo, either PEM or DER.

use base64::{Engine, engine::general_purpose::STANDARD};
use p384::{
    FieldBytes, SecretKey,
    pkcs8::{
        DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
        der::Document, spki::SubjectPublicKeyInfoRef,
    },
};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

pub use p384::PublicKey;

use crate::{
    CryptoError,
    agreement::{SessionKey, derive_session_key},
};

/// Size of a P-384 secret scalar in bytes.
pub const SCALAR_SIZE: usize = 48;

/// PEM prefix used to detect text-encoded keys.
const PEM_PREFIX: &str = "-----BEGIN";

/// A party's long-term P-384 key pair.
///
/// Created once, persisted, and loaded on every later start. Never mutated.
/// The secret scalar is zeroized when the pair is dropped.
#[derive(Clone)]
pub struct IdentityKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl IdentityKeyPair {
    /// Build a key pair from 48 caller-provided random bytes.
    ///
    /// # Errors
    ///
    /// - `GenerationFailed` if the bytes encode zero or a value not below the
    ///   curve order. With uniformly random input this has probability about
    ///   2^-190.
    pub fn from_scalar_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Self, CryptoError> {
        let field = FieldBytes::clone_from_slice(bytes);
        let secret = SecretKey::from_bytes(&field).map_err(|_| CryptoError::GenerationFailed {
            reason: "scalar is zero or exceeds the P-384 group order".to_string(),
        })?;

        Ok(Self::from_secret(secret))
    }

    /// Parse a PEM-encoded, unencrypted PKCS#8 private key.
    pub fn from_private_key_pem(pem: &str) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::MalformedKey { reason: e.to_string() })?;

        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Public half of this identity.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Secret scalar. Exclusively owned by this process.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Derive the session key shared with `their_public`.
    pub fn session_key_with(&self, their_public: &PublicKey) -> SessionKey {
        derive_session_key(&self.secret, their_public)
    }

    /// PEM-encoded PKCS#8 private key (unencrypted).
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::MalformedKey { reason: e.to_string() })
    }

    /// PEM-encoded SubjectPublicKeyInfo public key.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        encode_public_key_pem(&self.public)
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &public_key_fingerprint(&self.public))
            .finish_non_exhaustive()
    }
}

/// Encode a public key as PEM SubjectPublicKeyInfo.
pub fn encode_public_key_pem(public: &PublicKey) -> Result<String, CryptoError> {
    public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::MalformedKey { reason: e.to_string() })
}

/// Decode a peer public key blob.
///
/// Accepts, in order of detection:
/// - PEM text (`-----BEGIN PUBLIC KEY-----`)
/// - base64 of PEM text or of DER
/// - raw DER SubjectPublicKeyInfo
///
/// # Errors
///
/// - `IncompatibleKey` if the blob is a valid SubjectPublicKeyInfo for a
///   different algorithm or curve
/// - `MalformedKey` if it cannot be parsed at all
pub fn decode_public_key(blob: &[u8]) -> Result<PublicKey, CryptoError> {
    if let Ok(text) = std::str::from_utf8(blob) {
        let text = text.trim();
        if text.starts_with(PEM_PREFIX) {
            return decode_public_key_pem(text);
        }

        if let Ok(inner) = STANDARD.decode(text) {
            return match std::str::from_utf8(&inner).map(str::trim) {
                Ok(inner_text) if inner_text.starts_with(PEM_PREFIX) => {
                    decode_public_key_pem(inner_text)
                },
                _ => decode_public_key_der(&inner),
            };
        }
    }

    decode_public_key_der(blob)
}

fn decode_public_key_pem(pem: &str) -> Result<PublicKey, CryptoError> {
    let (_label, document) =
        Document::from_pem(pem).map_err(|e| CryptoError::MalformedKey { reason: e.to_string() })?;

    decode_public_key_der(document.as_bytes())
}

fn decode_public_key_der(der: &[u8]) -> Result<PublicKey, CryptoError> {
    match PublicKey::from_public_key_der(der) {
        Ok(public) => Ok(public),
        Err(e) => match SubjectPublicKeyInfoRef::try_from(der) {
            Ok(spki) => {
                let curve = spki
                    .algorithm
                    .parameters_oid()
                    .map_or_else(|_| "none".to_string(), |oid| oid.to_string());
                Err(CryptoError::IncompatibleKey {
                    reason: format!(
                        "expected P-384 key, got algorithm {} with parameters {curve}",
                        spki.algorithm.oid
                    ),
                })
            },
            Err(_) => Err(CryptoError::MalformedKey { reason: e.to_string() }),
        },
    }
}

/// Short hex fingerprint of a public key for logs and display.
///
/// First 8 bytes of SHA-256 over the SEC1 point encoding. Not a security
/// identifier.
pub fn public_key_fingerprint(public: &PublicKey) -> String {
    let digest = Sha256::digest(public.to_sec1_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
