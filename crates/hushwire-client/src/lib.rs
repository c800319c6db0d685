//! Hushwire Client
//!
//! End-to-end encryption for an existing text-messaging network. Each user
//! holds a long-lived P-384 identity and publishes the public half to a
//! shared directory. The first message in either direction derives a
//! per-peer AES key that both sides cache forever.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Runtime<T: Transport, ..>                    │
//! │   send(peer, text)        run(sink)          │
//! └─────────────┬───────────────────▲────────────┘
//!               │                   │
//! ┌─────────────▼───────────────────┴────────────┐
//! │ Session                                      │
//! │   prepare_outgoing        handle_incoming    │
//! │              resolve_key                     │
//! └──────┬──────────────┬──────────────┬─────────┘
//!        │              │              │
//!   SessionKeyStore   Directory    Identity (Arc)
//! ```
//!
//! Key resolution is the only place state changes: a cache miss fetches the
//! peer's public key, derives the session key and stores it with
//! `put_if_absent`. Whichever path stores first wins.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod directory;
mod error;
pub mod identity;
pub mod runtime;
pub mod session;
mod system_env;
pub mod transport;

pub use config::ClientConfig;
pub use directory::{Directory, HttpDirectory, MemoryDirectory, Publication, ensure_published};
pub use error::{ClientError, DirectoryError};
pub use identity::{Identity, load_or_create};
pub use runtime::{InboxEvent, OutgoingMessage, Runtime};
pub use session::Session;
pub use system_env::SystemEnv;
pub use transport::{Dialog, InboundMessage, Transport};
