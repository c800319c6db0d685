//! Runtime binding a transport to a session.
//!
//! The Runtime drives the message loop, coordinating between:
//! - [`Transport`]: the messaging network
//! - [`Session`]: key resolution and the message codec
//!
//! [`Runtime::run`] multiplexes an outbox of messages to send against
//! inbound transport events, so sending never waits for the inbox to drain.
//!
//! Per-message failures never stop the loop. A message that cannot be
//! decrypted is surfaced as [`InboxEvent::Unreadable`], or as
//! [`InboxEvent::Deferred`] with its ciphertext when a retry may succeed.
//! Only storage failures end [`Runtime::run`].

use hushwire_core::{Environment, PeerId, SessionKeyStore};
use hushwire_crypto::EncodedMessage;
use tokio::sync::mpsc;

use crate::{
    ClientError, Dialog, Directory, InboundMessage, Publication, Session, Transport,
    ensure_published,
};

/// A plaintext message queued for sending by [`Runtime::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient chat
    pub peer_id: PeerId,
    /// Plaintext
    pub text: String,
}

/// Events delivered to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxEvent {
    /// Message decrypted successfully.
    Message {
        /// Author
        sender_id: PeerId,
        /// Chat the message was posted in
        chat: Dialog,
        /// Whether `chat` is a group
        is_group: bool,
        /// Plaintext
        text: String,
    },

    /// Message could not be read; the loop moved on.
    Unreadable {
        /// Author
        sender_id: PeerId,
        /// Chat the message was posted in
        chat: Dialog,
        /// Why decryption failed
        reason: String,
    },

    /// Message could not be read yet because the directory was unreachable.
    ///
    /// Pass `encoded` to [`Session::handle_incoming`] once the directory is
    /// back.
    Deferred {
        /// Author
        sender_id: PeerId,
        /// Chat the message was posted in
        chat: Dialog,
        /// Whether `chat` is a group
        is_group: bool,
        /// Message body as received
        encoded: EncodedMessage,
        /// Why resolution failed
        reason: String,
    },

    /// A queued message could not be sent.
    SendFailed {
        /// Recipient chat
        peer_id: PeerId,
        /// Plaintext that was not delivered
        text: String,
        /// Why sending failed
        reason: String,
        /// Whether sending it again later may succeed
        transient: bool,
    },
}

/// Generic runtime over a transport and a session.
///
/// # Type Parameters
///
/// - `T`: messaging transport
/// - `S`, `D`, `E`: see [`Session`]
pub struct Runtime<T, S, D, E>
where
    T: Transport,
    S: SessionKeyStore,
    D: Directory,
    E: Environment,
{
    transport: T,
    session: Session<S, D, E>,
}

impl<T, S, D, E> Runtime<T, S, D, E>
where
    T: Transport,
    S: SessionKeyStore,
    D: Directory,
    E: Environment,
{
    /// Create a runtime; nothing happens until [`Self::start`].
    pub fn new(transport: T, session: Session<S, D, E>) -> Self {
        Self { transport, session }
    }

    /// Session used for encryption.
    pub fn session(&self) -> &Session<S, D, E> {
        &self.session
    }

    /// Connect the transport and make sure our public key is published.
    ///
    /// Publication failures are logged and reported as `None`; they do not
    /// fail startup.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the connection cannot be established.
    pub async fn start(&mut self, my_id: PeerId) -> Result<Option<Publication>, ClientError> {
        self.transport.connect().await.map_err(transport_error)?;

        match ensure_published(self.session.directory(), my_id, self.session.identity()).await {
            Ok(publication) => Ok(Some(publication)),
            Err(e) => {
                tracing::warn!(
                    peer = %my_id,
                    error = %e,
                    "Could not publish public key, continuing"
                );
                Ok(None)
            },
        }
    }

    /// Recent dialogs from the transport.
    pub async fn dialogs(&mut self, limit: usize) -> Result<Vec<Dialog>, ClientError> {
        self.transport.dialogs(limit).await.map_err(transport_error)
    }

    /// Encrypt `text` for `peer_id` and send it.
    pub async fn send(&mut self, peer_id: PeerId, text: &str) -> Result<(), ClientError> {
        let encoded = self.session.prepare_outgoing(peer_id, text).await?;
        self.transport.send_message(peer_id, encoded.as_str()).await.map_err(transport_error)
    }

    /// Send queued messages from `outbox` and consume inbound messages
    /// until the transport closes or `sink` is dropped.
    ///
    /// Queued messages are sent before the next inbound message is read.
    /// Empty inbound messages are skipped. Once `outbox` closes, the loop
    /// keeps receiving.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the key store fails. Every other per-message
    /// error becomes an [`InboxEvent`].
    pub async fn run(
        &mut self,
        mut outbox: mpsc::Receiver<OutgoingMessage>,
        sink: mpsc::Sender<InboxEvent>,
    ) -> Result<(), ClientError> {
        let mut outbox_open = true;

        loop {
            // Queued sends go out before further inbound traffic is read
            let event = tokio::select! {
                biased;

                queued = outbox.recv(), if outbox_open => match queued {
                    Some(outgoing) => self.deliver(outgoing).await?,
                    None => {
                        tracing::debug!("Outbox closed, receiving only");
                        outbox_open = false;
                        None
                    },
                },

                inbound = self.transport.next_event() => match inbound {
                    Some(message) => self.receive(message).await?,
                    None => break,
                },
            };

            if let Some(event) = event
                && sink.send(event).await.is_err()
            {
                tracing::debug!("Inbox receiver dropped, stopping");
                break;
            }
        }

        Ok(())
    }

    async fn deliver(
        &mut self,
        outgoing: OutgoingMessage,
    ) -> Result<Option<InboxEvent>, ClientError> {
        let OutgoingMessage { peer_id, text } = outgoing;

        match self.send(peer_id, &text).await {
            Ok(()) => Ok(None),
            Err(e @ ClientError::Storage(_)) => Err(e),
            Err(e) => {
                tracing::warn!(peer = %peer_id, error = %e, "Could not send message");
                let transient = e.is_transient();
                Ok(Some(InboxEvent::SendFailed { peer_id, text, reason: e.to_string(), transient }))
            },
        }
    }

    async fn receive(&self, message: InboundMessage) -> Result<Option<InboxEvent>, ClientError> {
        let InboundMessage { sender_id, text, is_group, chat } = message;

        if text.trim().is_empty() {
            tracing::debug!(peer = %sender_id, "Skipping empty message");
            return Ok(None);
        }

        let encoded = EncodedMessage::new(text);
        let event = match self.session.handle_incoming(sender_id, &encoded).await {
            Ok(text) => InboxEvent::Message { sender_id, chat, is_group, text },
            Err(e @ ClientError::Storage(_)) => return Err(e),
            Err(e) if e.is_transient() => {
                tracing::warn!(peer = %sender_id, error = %e, "Deferring message");
                InboxEvent::Deferred { sender_id, chat, is_group, encoded, reason: e.to_string() }
            },
            Err(e) => {
                tracing::warn!(
                    peer = %sender_id,
                    chat = %chat.peer_id,
                    error = %e,
                    "Cannot read this message"
                );
                InboxEvent::Unreadable { sender_id, chat, reason: e.to_string() }
            },
        };

        Ok(Some(event))
    }
}

fn transport_error(err: impl std::error::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}
