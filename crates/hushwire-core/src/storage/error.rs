//! Storage error types.
//!
//! Defines errors that can occur during storage operations:
//! - `Corrupt`: A stored value cannot be decoded (wrong length, bad encoding)
//! - `Io`: Underlying storage system errors (disk full, lock, database)

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Stored data exists but cannot be decoded.
    ///
    /// For the key store this means a value that is not a 32-byte key. For
    /// identity files it means unparsable or mutually inconsistent PEM.
    #[error("corrupt stored data at {location}: {reason}")]
    Corrupt {
        /// Table row or file that is corrupt
        location: String,
        /// What failed to decode
        reason: String,
    },

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
