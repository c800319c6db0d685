//! Session orchestration: resolve a peer's key, then encrypt or decrypt.
//!
//! Per-peer state is implicit in the key store:
//!
//! ```text
//! NoKey ──(directory fetch + ECDH + put_if_absent)──> KeyEstablished
//! ```
//!
//! `KeyEstablished` is permanent. The outgoing and incoming paths may race to
//! establish the same peer; both end up using whichever key the store
//! accepted first.

use std::sync::Arc;

use hushwire_core::{Environment, PeerId, SessionKeyStore, StorageError};
use hushwire_crypto::{
    CryptoError, EncodedMessage, IV_SIZE, SessionKey, decrypt_message, encrypt_message,
};

use crate::{ClientError, Directory, Identity};

/// Encrypts outgoing and decrypts incoming messages for one identity.
///
/// # Type Parameters
///
/// - `S`: session key store
/// - `D`: public key directory
/// - `E`: randomness source for IVs
#[derive(Clone)]
pub struct Session<S, D, E>
where
    S: SessionKeyStore,
    D: Directory,
    E: Environment,
{
    identity: Arc<Identity>,
    store: S,
    directory: D,
    env: E,
}

impl<S, D, E> Session<S, D, E>
where
    S: SessionKeyStore,
    D: Directory,
    E: Environment,
{
    /// Create a session for `identity`.
    pub fn new(identity: Arc<Identity>, store: S, directory: D, env: E) -> Self {
        Self { identity, store, directory, env }
    }

    /// Local identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Session key store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Public key directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Session key for `peer_id`, establishing it on first contact.
    ///
    /// A cache hit never touches the directory. On a miss the peer's public
    /// key is fetched, the key derived and offered to the store. If another
    /// caller stored a key first, the stored key is returned instead of the
    /// freshly derived one.
    ///
    /// # Errors
    ///
    /// - `Directory`: peer not published, or directory unreachable
    /// - `Storage`: store read or write failed
    pub async fn resolve_key(&self, peer_id: PeerId) -> Result<SessionKey, ClientError> {
        if let Some(key) = self.store.get(peer_id)? {
            tracing::debug!(peer = %peer_id, "Session key cache hit");
            return Ok(key);
        }

        let their_public = self.directory.fetch_public_key(peer_id).await?;
        let derived = self.identity.keys().session_key_with(&their_public);

        if self.store.put_if_absent(peer_id, &derived)? {
            tracing::info!(peer = %peer_id, "Established session key");
            return Ok(derived);
        }

        tracing::debug!(peer = %peer_id, "Lost establishment race, using stored key");
        self.store.get(peer_id)?.ok_or_else(|| {
            StorageError::Corrupt {
                location: format!("session_keys[{peer_id}]"),
                reason: "entry missing after rejected insert".to_string(),
            }
            .into()
        })
    }

    /// Encrypt `plaintext` for `peer_id` with a fresh IV.
    ///
    /// The result is sent verbatim as the transport message body.
    pub async fn prepare_outgoing(
        &self,
        peer_id: PeerId,
        plaintext: &str,
    ) -> Result<EncodedMessage, ClientError> {
        let key = self.resolve_key(peer_id).await?;
        let iv = self.env.random_array::<IV_SIZE>();

        Ok(encrypt_message(plaintext.as_bytes(), &key, iv))
    }

    /// Decrypt a message body received from `peer_id`.
    ///
    /// # Errors
    ///
    /// - `Crypto(MalformedInput)`: not a valid encoded message, or the
    ///   plaintext is not UTF-8
    /// - `Crypto(InvalidPadding)`: wrong key or corrupted ciphertext
    /// - plus everything [`Self::resolve_key`] reports
    pub async fn handle_incoming(
        &self,
        peer_id: PeerId,
        encoded: &EncodedMessage,
    ) -> Result<String, ClientError> {
        let key = self.resolve_key(peer_id).await?;
        let plaintext = decrypt_message(encoded, &key)?;

        String::from_utf8(plaintext).map_err(|_| {
            CryptoError::MalformedInput { reason: "plaintext is not valid UTF-8".to_string() }
                .into()
        })
    }
}
