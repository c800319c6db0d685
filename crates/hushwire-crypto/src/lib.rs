//! Hushwire Cryptographic Primitives
//!
//! Cryptographic building blocks for Hushwire. Pure functions with
//! deterministic outputs. Callers provide random bytes (IVs, identity scalars)
//! for deterministic testing.
//!
//! # Key Lifecycle
//!
//! Each party owns one long-term P-384 identity. For every peer, a session key
//! is derived once from the ECDH shared secret and then reused for all
//! messages exchanged with that peer.
//!
//! ```text
//! Identity (P-384 secret)  +  Peer public key
//!        │
//!        ▼
//! ECDH → Shared secret (48 bytes)
//!        │
//!        ▼
//! HKDF-SHA256 (no salt, no info) → Session Key (32 bytes)
//!        │
//!        ▼
//! AES-256-CBC + PKCS#7, random IV → base64(IV || ciphertext)
//! ```
//!
//! # Security
//!
//! Symmetry:
//! - Both parties derive the same session key independently
//! - Any change to salt, info or output length breaks interoperability
//!   silently: ciphertext decrypts to garbage, not to an error
//!
//! Confidentiality:
//! - AES-256-CBC with a fresh random 16-byte IV per message
//!
//! Integrity:
//! - None. CBC with PKCS#7 carries no authentication tag. A padding failure
//!   is the only tamper signal and its absence does not imply authenticity.
//!
//! Forward Secrecy:
//! - None. Session keys are long-lived and derived from long-term identities.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agreement;
pub mod codec;
mod error;
pub mod identity;

pub use agreement::{SESSION_KEY_SIZE, SessionKey, derive_session_key};
pub use codec::{EncodedMessage, IV_SIZE, decrypt_message, encrypt_message};
pub use error::CryptoError;
pub use identity::{
    IdentityKeyPair, PublicKey, SCALAR_SIZE, decode_public_key, encode_public_key_pem,
    public_key_fingerprint,
};
