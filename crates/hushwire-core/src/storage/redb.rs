//! Redb-backed durable session key store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Redb
//! serializes write transactions, which makes the check-then-insert in
//! `put_if_absent` atomic across threads and clones.

use std::{fmt::Display, path::Path, sync::Arc};

use hushwire_crypto::SessionKey;
use redb::{Database, ReadableTable, TableDefinition};

use super::{SessionKeyStore, StorageError};
use crate::PeerId;

/// Table: session_keys
/// Key: peer id (i64)
/// Value: 32-byte session key
const SESSION_KEYS: TableDefinition<i64, &[u8]> = TableDefinition::new("session_keys");

/// Durable session key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the SESSION_KEYS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened, created,
    /// or is not a valid Redb file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        let txn = db.begin_write().map_err(io_error)?;
        {
            let _ = txn.open_table(SESSION_KEYS).map_err(io_error)?;
        }
        txn.commit().map_err(io_error)?;

        tracing::debug!(path = %path.as_ref().display(), "Opened session key store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl SessionKeyStore for RedbKeyStore {
    fn get(&self, peer_id: PeerId) -> Result<Option<SessionKey>, StorageError> {
        let txn = self.db.begin_read().map_err(io_error)?;
        let table = txn.open_table(SESSION_KEYS).map_err(io_error)?;

        match table.get(peer_id.as_i64()).map_err(io_error)? {
            Some(value) => decode_key(peer_id, value.value()).map(Some),
            None => Ok(None),
        }
    }

    fn put_if_absent(&self, peer_id: PeerId, key: &SessionKey) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(io_error)?;

        {
            let mut table = txn.open_table(SESSION_KEYS).map_err(io_error)?;

            if table.get(peer_id.as_i64()).map_err(io_error)?.is_some() {
                tracing::debug!(peer = %peer_id, "Session key already stored, keeping it");
                return Ok(false);
            }

            table.insert(peer_id.as_i64(), key.as_bytes().as_slice()).map_err(io_error)?;
        }

        txn.commit().map_err(io_error)?;

        Ok(true)
    }

    fn peers(&self) -> Result<Vec<PeerId>, StorageError> {
        let txn = self.db.begin_read().map_err(io_error)?;
        let table = txn.open_table(SESSION_KEYS).map_err(io_error)?;

        let mut peers = Vec::new();
        for result in table.iter().map_err(io_error)? {
            let (key, _) = result.map_err(io_error)?;
            peers.push(PeerId::new(key.value()));
        }

        Ok(peers)
    }
}

fn decode_key(peer_id: PeerId, bytes: &[u8]) -> Result<SessionKey, StorageError> {
    SessionKey::from_slice(bytes).map_err(|e| StorageError::Corrupt {
        location: format!("session_keys[{peer_id}]"),
        reason: e.to_string(),
    })
}

fn io_error(err: impl Display) -> StorageError {
    StorageError::Io(err.to_string())
}
