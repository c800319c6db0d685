//! Message encryption using AES-256-CBC with PKCS#7 padding.
//!
//! All functions are pure - the IV must be provided by the caller.
//!
//! Wire format (a single text string):
//!
//! ```text
//! base64( IV [16 bytes] || AES-256-CBC ciphertext [n * 16 bytes] )
//! ```

use aes::Aes256;
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::{CryptoError, SessionKey};

/// Size of the CBC initialization vector (16 bytes)
pub const IV_SIZE: usize = 16;

/// AES block size (16 bytes)
const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// A transport-safe encrypted message: `base64(iv || ciphertext)`.
///
/// Constructed per message and sent verbatim as the transport message body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedMessage(String);

impl EncodedMessage {
    /// Wrap a string received from the transport.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Text to hand to the transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for EncodedMessage {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for EncodedMessage {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl AsRef<str> for EncodedMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EncodedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt a message with AES-256-CBC.
///
/// # Security
///
/// - Caller MUST provide a fresh, cryptographically random IV per message
/// - No authentication tag is produced
pub fn encrypt_message(plaintext: &[u8], key: &SessionKey, iv: [u8; IV_SIZE]) -> EncodedMessage {
    let cipher = Aes256CbcEnc::new(key.as_bytes().into(), (&iv).into());
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut wire = Vec::with_capacity(IV_SIZE + ciphertext.len());
    wire.extend_from_slice(&iv);
    wire.extend_from_slice(&ciphertext);

    EncodedMessage(STANDARD.encode(wire))
}

/// Decrypt a message produced by [`encrypt_message`].
///
/// Surrounding whitespace in the encoded text is ignored.
///
/// # Errors
///
/// - `MalformedInput`: not base64, shorter than an IV, or a ciphertext body
///   that is empty or not block-aligned
/// - `InvalidPadding`: PKCS#7 check failed (wrong key or corruption)
pub fn decrypt_message(encoded: &EncodedMessage, key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    let wire = STANDARD
        .decode(encoded.as_str().trim())
        .map_err(|e| CryptoError::MalformedInput { reason: format!("invalid base64: {e}") })?;

    if wire.len() < IV_SIZE {
        return Err(CryptoError::MalformedInput {
            reason: format!("{} bytes is too short to contain an IV", wire.len()),
        });
    }

    let (iv, ciphertext) = wire.split_at(IV_SIZE);

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::MalformedInput {
            reason: format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            ),
        });
    }

    let iv: [u8; IV_SIZE] = iv
        .try_into()
        .map_err(|_| CryptoError::MalformedInput { reason: "IV split failed".to_string() })?;

    let cipher = Aes256CbcDec::new(key.as_bytes().into(), (&iv).into());
    cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).map_err(|_| CryptoError::InvalidPadding)
}
