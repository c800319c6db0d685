//! Hushwire Core
//!
//! Shared building blocks for the Hushwire end-to-end encryption overlay:
//! peer identifiers, the environment abstraction for randomness, and the
//! session key store that caches one derived key per peer.
//!
//! # Session Key Invariants
//!
//! Both parties derive a peer's session key independently from the same ECDH
//! computation, so the stored value must never change once written:
//!
//! - At most one entry exists per peer id
//! - The first writer wins; later writers observe the existing entry
//! - Entries are never updated or deleted by this crate

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod peer;
pub mod storage;

pub use env::Environment;
pub use peer::PeerId;
pub use storage::{SessionKeyStore, StorageError};
