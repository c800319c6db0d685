//! Public key directory.
//!
//! A key-value web service mapping peer id to that peer's public key:
//!
//! ```text
//! GET  <base>/<peer_id>          200 + key bytes, or 404 if never published
//! POST <base>/update/<peer_id>   form field pub_key = base64(PEM SPKI)
//! ```
//!
//! The directory is trusted. Nothing authenticates the returned key.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use hushwire_core::PeerId;
use hushwire_crypto::{PublicKey, decode_public_key, encode_public_key_pem, public_key_fingerprint};
use reqwest::StatusCode;

use crate::{DirectoryError, Identity};

/// Lookup and publication of peer public keys.
///
/// Implementations share state via Arc, so clones talk to the same
/// directory.
pub trait Directory: Clone + Send + Sync + 'static {
    /// Fetch the public key a peer published.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the peer never published
    /// - `Unavailable`: network or service failure, not retried
    /// - `InvalidKey`: the stored bytes are not a usable P-384 key
    fn fetch_public_key(
        &self,
        peer_id: PeerId,
    ) -> impl Future<Output = Result<PublicKey, DirectoryError>> + Send;

    /// Publish this client's public key under `peer_id`.
    ///
    /// Idempotent, best effort.
    fn publish_public_key(
        &self,
        peer_id: PeerId,
        public_key: &PublicKey,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Outcome of [`ensure_published`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// Directory already holds our key
    AlreadyPublished,
    /// Directory had no entry; our key was uploaded
    Published,
    /// Directory holds a different key for our id; left untouched
    Mismatch,
}

/// Startup step: publish our key if the directory has never seen our id.
///
/// A differing key already on record is logged and left alone.
///
/// # Errors
///
/// Any lookup or upload failure other than `NotFound`. Callers treat these
/// as non-fatal.
pub async fn ensure_published<D: Directory>(
    directory: &D,
    my_id: PeerId,
    identity: &Identity,
) -> Result<Publication, DirectoryError> {
    match directory.fetch_public_key(my_id).await {
        Ok(existing) if &existing == identity.public_key() => {
            tracing::debug!(peer = %my_id, "Public key already published");
            Ok(Publication::AlreadyPublished)
        },
        Ok(existing) => {
            tracing::warn!(
                peer = %my_id,
                directory = %public_key_fingerprint(&existing),
                local = %identity.fingerprint(),
                "Directory holds a different public key for our id"
            );
            Ok(Publication::Mismatch)
        },
        Err(DirectoryError::NotFound { .. }) => {
            directory.publish_public_key(my_id, identity.public_key()).await?;
            tracing::info!(
                peer = %my_id,
                fingerprint = %identity.fingerprint(),
                "Published public key"
            );
            Ok(Publication::Published)
        },
        Err(e) => Err(e),
    }
}

/// Directory client over HTTP.
#[derive(Clone)]
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDirectory {
    /// Client for the directory at `base_url`, each request bounded by
    /// `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    fn key_url(&self, peer_id: PeerId) -> String {
        format!("{}/{peer_id}", self.base_url)
    }

    fn update_url(&self, peer_id: PeerId) -> String {
        format!("{}/update/{peer_id}", self.base_url)
    }
}

impl Directory for HttpDirectory {
    async fn fetch_public_key(&self, peer_id: PeerId) -> Result<PublicKey, DirectoryError> {
        let resp = self
            .client
            .get(self.key_url(peer_id))
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let body =
                    resp.bytes().await.map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
                decode_public_key(&body)
                    .map_err(|source| DirectoryError::InvalidKey { peer_id, source })
            },
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound { peer_id }),
            other => Err(DirectoryError::Unavailable(format!("lookup returned status {other}"))),
        }
    }

    async fn publish_public_key(
        &self,
        peer_id: PeerId,
        public_key: &PublicKey,
    ) -> Result<(), DirectoryError> {
        let pem = encode_public_key_pem(public_key)
            .map_err(|source| DirectoryError::InvalidKey { peer_id, source })?;
        let form = [("pub_key", STANDARD.encode(pem))];

        let resp = self
            .client
            .post(self.update_url(peer_id))
            .form(&form)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DirectoryError::Unavailable(format!("publish returned status {}", resp.status())))
        }
    }
}

/// In-process directory for tests and simulation.
///
/// Can be switched offline to exercise `Unavailable` handling. Uses
/// `lock().expect()` which will panic if the mutex is poisoned - acceptable
/// for test code.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    keys: Arc<Mutex<HashMap<PeerId, PublicKey>>>,
    offline: Arc<AtomicBool>,
    publishes: Arc<AtomicUsize>,
}

impl MemoryDirectory {
    /// Create an empty, online directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the directory offline (every call fails with `Unavailable`) or
    /// bring it back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful publish calls so far.
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    /// Key currently on record for a peer.
    #[allow(clippy::expect_used)]
    pub fn get(&self, peer_id: PeerId) -> Option<PublicKey> {
        self.keys.lock().expect("Mutex poisoned").get(&peer_id).copied()
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("directory offline".to_string()));
        }
        Ok(())
    }
}

impl Directory for MemoryDirectory {
    async fn fetch_public_key(&self, peer_id: PeerId) -> Result<PublicKey, DirectoryError> {
        self.check_online()?;
        self.get(peer_id).ok_or(DirectoryError::NotFound { peer_id })
    }

    #[allow(clippy::expect_used)]
    async fn publish_public_key(
        &self,
        peer_id: PeerId,
        public_key: &PublicKey,
    ) -> Result<(), DirectoryError> {
        self.check_online()?;
        self.keys.lock().expect("Mutex poisoned").insert(peer_id, *public_key);
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
