//! Session key storage for Hushwire
//!
//! Trait-based abstraction for persisting one derived session key per peer.
//! The trait is synchronous (no async) to keep the storage API simple; callers
//! on an async runtime treat each call as a short, bounded I/O step.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticKeyStore;
pub use error::StorageError;
use hushwire_crypto::SessionKey;
pub use memory::MemoryKeyStore;

pub use self::redb::RedbKeyStore;
use crate::PeerId;

/// Durable mapping from peer id to derived session key.
///
/// Must be Clone (shared by the outgoing and incoming message paths), Send +
/// Sync (thread-safe), and synchronous. Implementations share internal state
/// via Arc, so clones access the same underlying store.
///
/// # Invariants
///
/// - At most one entry per peer id
/// - An entry, once written, is never overwritten
/// - `put_if_absent` is atomic: when two callers race for the same peer,
///   exactly one insert succeeds
pub trait SessionKeyStore: Clone + Send + Sync + 'static {
    /// Session key for a peer. `None` if no key has been established.
    ///
    /// Read-only, no side effects.
    fn get(&self, peer_id: PeerId) -> Result<Option<SessionKey>, StorageError>;

    /// Persist a session key unless the peer already has one.
    ///
    /// Returns `true` if the key was inserted, `false` if an entry already
    /// existed (the existing entry is left untouched). Losing the race is not
    /// an error.
    ///
    /// # Invariants
    ///
    /// - Post: `get(peer_id)` returns the first key ever inserted
    fn put_if_absent(&self, peer_id: PeerId, key: &SessionKey) -> Result<bool, StorageError>;

    /// All peers with an established session key.
    ///
    /// Order is not guaranteed.
    fn peers(&self) -> Result<Vec<PeerId>, StorageError>;
}
