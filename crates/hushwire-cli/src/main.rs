//! Hushwire command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Create the identity and publish it under our messaging id
//! hushwire init --me 123456
//!
//! # Encrypt for a peer; the output is the message body to send
//! hushwire encrypt --peer 654321 "hello"
//!
//! # Decrypt a received body
//! hushwire decrypt --peer 654321 "q83vEjRWeJq..."
//! ```
//!
//! Every option can also be set through its `HUSHWIRE_*` environment
//! variable.

use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use hushwire_client::{
    ClientConfig, ClientError, HttpDirectory, Identity, Publication, Session, SystemEnv,
    ensure_published, load_or_create,
};
use hushwire_core::{PeerId, SessionKeyStore, storage::RedbKeyStore};
use hushwire_crypto::EncodedMessage;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// End-to-end encryption for text messaging
#[derive(Parser, Debug)]
#[command(name = "hushwire")]
#[command(about = "End-to-end encryption overlay for text messaging")]
#[command(version)]
struct Args {
    /// Directory holding the identity files and session key store
    #[arg(long, env = "HUSHWIRE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Session key store file name inside the data directory
    #[arg(long, env = "HUSHWIRE_KEY_STORE")]
    key_store: Option<String>,

    /// Base URL of the public key directory
    #[arg(long, env = "HUSHWIRE_DIRECTORY_URL")]
    directory_url: Option<String>,

    /// Directory request timeout in seconds
    #[arg(long, env = "HUSHWIRE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HUSHWIRE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load or create the identity and publish it if the directory lacks it
    Init {
        /// Our id on the messaging network
        #[arg(long, env = "HUSHWIRE_ME", allow_negative_numbers = true)]
        me: PeerId,
    },

    /// Encrypt a message for a peer
    Encrypt {
        /// Recipient id
        #[arg(long, env = "HUSHWIRE_PEER", allow_negative_numbers = true)]
        peer: PeerId,

        /// Plaintext
        text: String,
    },

    /// Decrypt a message received from a peer
    Decrypt {
        /// Sender id
        #[arg(long, env = "HUSHWIRE_PEER", allow_negative_numbers = true)]
        peer: PeerId,

        /// Encoded message body
        blob: String,
    },

    /// List peers with an established session key
    Peers,

    /// Print the local public key
    Fingerprint,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();

        ClientConfig {
            data_dir: self.data_dir.clone().unwrap_or(defaults.data_dir),
            key_store_file: self.key_store.clone().unwrap_or(defaults.key_store_file),
            directory_url: self.directory_url.clone().unwrap_or(defaults.directory_url),
            request_timeout: self
                .timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
        }
    }
}

type CliSession = Session<RedbKeyStore, HttpDirectory, SystemEnv>;

fn open_session(config: &ClientConfig) -> Result<CliSession, Box<dyn std::error::Error>> {
    let identity = Arc::new(load_identity(config)?);
    let store = RedbKeyStore::open(config.key_store_path())?;
    let directory = HttpDirectory::new(&config.directory_url, config.request_timeout)?;

    Ok(Session::new(identity, store, directory, SystemEnv::new()))
}

fn load_identity(config: &ClientConfig) -> Result<Identity, ClientError> {
    load_or_create(&config.data_dir, &SystemEnv::new())
}

async fn run(args: Args, out: &mut impl Write) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.config();

    match args.command {
        Command::Init { me } => {
            let identity = load_identity(&config)?;
            let directory = HttpDirectory::new(&config.directory_url, config.request_timeout)?;

            match ensure_published(&directory, me, &identity).await {
                Ok(Publication::Published) => writeln!(out, "published public key for {me}")?,
                Ok(Publication::AlreadyPublished) => writeln!(out, "public key already published")?,
                Ok(Publication::Mismatch) => {
                    writeln!(out, "directory holds a different key for {me}; not replaced")?;
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Could not publish public key");
                    writeln!(out, "identity ready, public key not published: {e}")?;
                },
            }
            writeln!(out, "fingerprint {}", identity.fingerprint())?;
        },
        Command::Encrypt { peer, text } => {
            let session = open_session(&config)?;
            let encoded = session.prepare_outgoing(peer, &text).await?;
            writeln!(out, "{encoded}")?;
        },
        Command::Decrypt { peer, blob } => {
            let session = open_session(&config)?;

            match session.handle_incoming(peer, &EncodedMessage::new(blob)).await {
                Ok(text) => writeln!(out, "{text}")?,
                Err(e) if e.is_message_local() => {
                    return Err(format!("cannot read this message: {e}").into());
                },
                Err(e) => return Err(e.into()),
            }
        },
        Command::Peers => {
            let path = config.key_store_path();
            if !path.exists() {
                return Ok(());
            }

            let store = RedbKeyStore::open(path)?;
            let mut peers = store.peers()?;
            peers.sort();

            for peer in peers {
                writeln!(out, "{peer}")?;
            }
        },
        Command::Fingerprint => {
            let identity = load_identity(&config)?;
            write!(out, "{}", identity.public_key_pem())?;
            writeln!(out, "fingerprint {}", identity.fingerprint())?;
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    run(args, &mut std::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use hushwire_crypto::SessionKey;
    use tempfile::tempdir;

    use super::*;

    /// Directory URL nothing listens on
    const DEAD_DIRECTORY: &str = "http://127.0.0.1:9";

    fn args(dir: &std::path::Path, rest: &[&str]) -> Args {
        let mut argv = vec![
            "hushwire".to_string(),
            "--data-dir".to_string(),
            dir.display().to_string(),
            "--directory-url".to_string(),
            DEAD_DIRECTORY.to_string(),
            "--timeout-secs".to_string(),
            "1".to_string(),
        ];
        argv.extend(rest.iter().map(|s| (*s).to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    async fn run_to_string(args: Args) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();
        run(args, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn negative_peer_ids_parse() {
        let argv = ["hushwire", "encrypt", "--peer", "-100123", "hi"];
        let args = Args::try_parse_from(argv).unwrap();

        assert!(matches!(
            args.command,
            Command::Encrypt { peer, .. } if peer == PeerId::new(-100_123)
        ));
    }

    #[test]
    fn explicit_options_build_config() {
        let args = Args::try_parse_from([
            "hushwire",
            "--data-dir",
            "/tmp/alice",
            "--key-store",
            "alice.redb",
            "--timeout-secs",
            "3",
            "peers",
        ])
        .unwrap();

        let config = args.config();
        assert_eq!(config.key_store_path(), PathBuf::from("/tmp/alice/alice.redb"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn fingerprint_prints_public_pem() {
        let dir = tempdir().unwrap();

        let output = run_to_string(args(dir.path(), &["fingerprint"])).await.unwrap();

        assert!(output.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(output.contains("fingerprint "));
    }

    #[tokio::test]
    async fn init_without_directory_still_creates_identity() {
        let dir = tempdir().unwrap();

        let output = run_to_string(args(dir.path(), &["init", "--me", "42"])).await.unwrap();

        assert!(output.contains("not published"));
        assert!(dir.path().join(hushwire_client::identity::PRIVATE_KEY_FILE).exists());
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_with_stored_key() {
        let dir = tempdir().unwrap();
        {
            let store = RedbKeyStore::open(dir.path().join("key_store.redb")).unwrap();
            store.put_if_absent(PeerId::new(5), &SessionKey::new([3; 32])).unwrap();
        }

        let encoded = run_to_string(args(dir.path(), &["encrypt", "--peer", "5", "hello"]))
            .await
            .unwrap();
        let decrypt = args(dir.path(), &["decrypt", "--peer", "5", encoded.trim()]);
        let decoded = run_to_string(decrypt).await.unwrap();

        assert_eq!(decoded, "hello\n");
    }

    #[tokio::test]
    async fn unreadable_blob_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        {
            let store = RedbKeyStore::open(dir.path().join("key_store.redb")).unwrap();
            store.put_if_absent(PeerId::new(5), &SessionKey::new([3; 32])).unwrap();
        }

        let result = run_to_string(args(dir.path(), &["decrypt", "--peer", "5", "garbage!"])).await;

        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("cannot read this message"));
    }

    #[tokio::test]
    async fn peers_lists_established_sessions() {
        let dir = tempdir().unwrap();
        {
            let store = RedbKeyStore::open(dir.path().join("key_store.redb")).unwrap();
            for id in [9, -4, 2] {
                store.put_if_absent(PeerId::new(id), &SessionKey::new([1; 32])).unwrap();
            }
        }

        let output = run_to_string(args(dir.path(), &["peers"])).await.unwrap();

        assert_eq!(output, "-4\n2\n9\n");
    }

    #[tokio::test]
    async fn peers_does_not_create_identity() {
        let dir = tempdir().unwrap();

        let output = run_to_string(args(dir.path(), &["peers"])).await.unwrap();

        assert!(output.is_empty());
        assert!(!dir.path().join("key_store.redb").exists());
        assert!(!dir.path().join(hushwire_client::identity::PRIVATE_KEY_FILE).exists());
        assert!(!dir.path().join(hushwire_client::identity::PUBLIC_KEY_FILE).exists());
    }
}
