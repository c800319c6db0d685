//! Client configuration.

use std::{path::PathBuf, time::Duration};

/// Where the client keeps its state and which directory it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Directory holding the identity PEM files and the session key store
    pub data_dir: PathBuf,

    /// Session key store file name, relative to `data_dir`
    pub key_store_file: String,

    /// Base URL of the public key directory
    pub directory_url: String,

    /// Upper bound for a single directory request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Full path of the session key store.
    pub fn key_store_path(&self) -> PathBuf {
        self.data_dir.join(&self.key_store_file)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("blobs"),
            key_store_file: "key_store.redb".to_string(),
            directory_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
