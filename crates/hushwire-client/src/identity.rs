//! Long-lived identity persisted as two PEM files.
//!
//! ```text
//! <data_dir>/my_ecdh_private_key.pem   PKCS#8, unencrypted, mode 0600
//! <data_dir>/my_ecdh_public_key.pem    SubjectPublicKeyInfo
//! ```
//!
//! | private | public | result                                         |
//! |---------|--------|------------------------------------------------|
//! | absent  | absent | generate, write both files                     |
//! | present | absent | load, re-derive and rewrite the public file    |
//! | absent  | present| corrupt state                                  |
//! | present | present| load; corrupt state if the two keys disagree   |

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

use hushwire_core::{Environment, StorageError};
use hushwire_crypto::{
    IdentityKeyPair, PublicKey, SCALAR_SIZE, decode_public_key, public_key_fingerprint,
};
use zeroize::Zeroizing;

use crate::ClientError;

/// File name of the PEM private key inside the data directory
pub const PRIVATE_KEY_FILE: &str = "my_ecdh_private_key.pem";

/// File name of the PEM public key inside the data directory
pub const PUBLIC_KEY_FILE: &str = "my_ecdh_public_key.pem";

/// This client's identity: the key pair plus its published PEM encoding.
///
/// Read-only once loaded. Shared between the outgoing and incoming paths
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Identity {
    keys: IdentityKeyPair,
    public_pem: String,
}

impl Identity {
    /// Wrap a key pair that is not backed by files.
    pub fn from_key_pair(keys: IdentityKeyPair) -> Result<Self, ClientError> {
        let public_pem = keys.public_key_pem()?;
        Ok(Self { keys, public_pem })
    }

    /// Generate a fresh identity from environment randomness without
    /// touching the filesystem.
    pub fn generate<E: Environment>(env: &E) -> Result<Self, ClientError> {
        let scalar = Zeroizing::new(env.random_array::<SCALAR_SIZE>());
        Self::from_key_pair(IdentityKeyPair::from_scalar_bytes(&scalar)?)
    }

    /// Key pair used for agreement.
    pub fn keys(&self) -> &IdentityKeyPair {
        &self.keys
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    /// PEM `SubjectPublicKeyInfo` text, as stored on disk.
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Short fingerprint for display and logs.
    pub fn fingerprint(&self) -> String {
        public_key_fingerprint(self.public_key())
    }
}

/// Load the identity from `dir`, creating it on first use.
///
/// The directory is created if missing. Later calls only read.
///
/// # Errors
///
/// - `Storage`: files unreadable, unparseable, or inconsistent with each other
/// - `Crypto(GenerationFailed)`: the drawn scalar is not a valid private key
pub fn load_or_create<E: Environment>(dir: &Path, env: &E) -> Result<Identity, ClientError> {
    fs::create_dir_all(dir).map_err(StorageError::from)?;

    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);

    let private_pem = read_optional(&private_path)?.map(Zeroizing::new);
    let public_pem = read_optional(&public_path)?;

    match (private_pem, public_pem) {
        (None, None) => create(&private_path, &public_path, env),
        (Some(private_pem), None) => {
            let identity = parse_private(&private_path, &private_pem)?;
            fs::write(&public_path, identity.public_key_pem()).map_err(StorageError::from)?;

            tracing::warn!(
                fingerprint = %identity.fingerprint(),
                "Public key file missing, re-derived from private key"
            );
            Ok(identity)
        },
        (None, Some(_)) => {
            Err(corrupt(&private_path, "public key exists without private key").into())
        },
        (Some(private_pem), Some(public_pem)) => {
            let identity = parse_private(&private_path, &private_pem)?;
            let stored_public = decode_public_key(public_pem.as_bytes())
                .map_err(|e| corrupt(&public_path, e))?;

            if &stored_public != identity.public_key() {
                return Err(corrupt(&public_path, "public key does not match private key").into());
            }

            tracing::debug!(fingerprint = %identity.fingerprint(), "Identity loaded");
            Ok(identity)
        },
    }
}

fn create<E: Environment>(
    private_path: &Path,
    public_path: &Path,
    env: &E,
) -> Result<Identity, ClientError> {
    let identity = Identity::generate(env)?;
    let private_pem = identity.keys().private_key_pem()?;

    write_private(private_path, &private_pem).map_err(StorageError::from)?;
    fs::write(public_path, identity.public_key_pem()).map_err(StorageError::from)?;

    tracing::info!(fingerprint = %identity.fingerprint(), "Created new identity");
    Ok(identity)
}

fn parse_private(path: &Path, pem: &str) -> Result<Identity, ClientError> {
    let keys = IdentityKeyPair::from_private_key_pem(pem).map_err(|e| corrupt(path, e))?;
    Identity::from_key_pair(keys)
}

fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create the private key file, failing if it already exists.
fn write_private(path: &Path, pem: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(pem.as_bytes())?;
    file.sync_all()
}

fn corrupt(path: &Path, reason: impl ToString) -> StorageError {
    StorageError::Corrupt { location: path.display().to_string(), reason: reason.to_string() }
}
