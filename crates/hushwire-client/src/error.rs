//! Client error types.
//!
//! Two enums: `DirectoryError` for the public key directory, and
//! `ClientError` for everything a session or runtime operation can report.
//! `ClientError` classifies itself so callers can decide whether to skip a
//! single message, retry, or stop.

use hushwire_core::{PeerId, StorageError};
use hushwire_crypto::CryptoError;
use thiserror::Error;

/// Errors from the public key directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Peer has never published a public key.
    #[error("peer {peer_id} has not published a public key")]
    NotFound {
        /// Peer that was looked up
        peer_id: PeerId,
    },

    /// Network failure, timeout, or unexpected response from the service.
    ///
    /// Transient. Not retried internally.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// Directory returned a key that cannot be used for agreement.
    #[error("directory key for peer {peer_id} is unusable: {source}")]
    InvalidKey {
        /// Peer whose key was fetched
        peer_id: PeerId,
        /// Decode failure
        #[source]
        source: CryptoError,
    },
}

/// Errors from session and runtime operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Session key store or identity files failed.
    ///
    /// Fatal at startup; never swallowed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Cryptographic failure (decode, padding, key format, generation).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Public key directory failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Messaging transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Whether the error is confined to a single message.
    ///
    /// Message-local errors are reported as an unreadable message and the
    /// caller moves on to the next event.
    pub fn is_message_local(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_message_local(),
            Self::Directory(directory) => !matches!(directory, DirectoryError::Unavailable(_)),
            Self::Storage(_) | Self::Transport(_) => false,
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Directory(DirectoryError::Unavailable(_)) | Self::Transport(_))
    }
}
