#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use hushwire_crypto::SessionKey;

use super::{SessionKeyStore, StorageError};
use crate::PeerId;

/// In-memory session key store for testing and simulation
///
/// Uses a `HashMap` keyed by peer id. State is wrapped in Arc<Mutex<>> to allow
/// Clone and concurrent access; the mutex makes `put_if_absent` atomic. Uses
/// `lock().expect()` which will panic if the mutex is poisoned - acceptable
/// for test code.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<Mutex<HashMap<PeerId, SessionKey>>>,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of peers with a stored key.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.keys.lock().expect("Mutex poisoned").len()
    }

    /// True if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionKeyStore for MemoryKeyStore {
    #[allow(clippy::expect_used)]
    fn get(&self, peer_id: PeerId) -> Result<Option<SessionKey>, StorageError> {
        let keys = self.keys.lock().expect("Mutex poisoned");
        Ok(keys.get(&peer_id).cloned())
    }

    #[allow(clippy::expect_used)]
    fn put_if_absent(&self, peer_id: PeerId, key: &SessionKey) -> Result<bool, StorageError> {
        let mut keys = self.keys.lock().expect("Mutex poisoned");

        if keys.contains_key(&peer_id) {
            return Ok(false);
        }

        keys.insert(peer_id, key.clone());
        Ok(true)
    }

    #[allow(clippy::expect_used)]
    fn peers(&self) -> Result<Vec<PeerId>, StorageError> {
        let keys = self.keys.lock().expect("Mutex poisoned");
        Ok(keys.keys().copied().collect())
    }
}
