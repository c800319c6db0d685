//! Shared fixtures: an in-memory transport and file-backed parties.

#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use hushwire_client::{
    Dialog, Directory, Identity, InboundMessage, MemoryDirectory, Session, SystemEnv, Transport,
    load_or_create,
};
use hushwire_core::{PeerId, storage::RedbKeyStore};
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure of the in-memory transport.
#[derive(Debug, Error)]
#[error("channel transport: {0}")]
pub struct ChannelError(pub String);

/// Transport backed by unbounded channels.
///
/// `send_message` delivers to whoever holds the outgoing receiver;
/// `next_event` yields whatever arrives on the incoming sender and ends once
/// every sender is dropped.
pub struct ChannelTransport {
    me: PeerId,
    peer: Option<PeerId>,
    connected: bool,
    outgoing: mpsc::UnboundedSender<InboundMessage>,
    incoming: mpsc::UnboundedReceiver<InboundMessage>,
}

impl ChannelTransport {
    /// Transport driven directly by the test: inject inbound messages and
    /// observe outbound ones.
    pub fn detached(
        me: PeerId,
    ) -> (Self, mpsc::UnboundedSender<InboundMessage>, mpsc::UnboundedReceiver<InboundMessage>)
    {
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let transport =
            Self { me, peer: None, connected: false, outgoing: out_tx, incoming: inject_rx };
        (transport, inject_tx, out_rx)
    }
}

/// Two transports wired to each other as a direct chat.
pub fn transport_pair(a: PeerId, b: PeerId) -> (ChannelTransport, ChannelTransport) {
    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let left = ChannelTransport {
        me: a,
        peer: Some(b),
        connected: false,
        outgoing: a_to_b_tx,
        incoming: b_to_a_rx,
    };
    let right = ChannelTransport {
        me: b,
        peer: Some(a),
        connected: false,
        outgoing: b_to_a_tx,
        incoming: a_to_b_rx,
    };
    (left, right)
}

impl Transport for ChannelTransport {
    type Error = ChannelError;

    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.connected = true;
        Ok(())
    }

    async fn dialogs(&mut self, limit: usize) -> Result<Vec<Dialog>, ChannelError> {
        Ok(self
            .peer
            .into_iter()
            .map(|peer_id| Dialog { peer_id, title: format!("user {peer_id}") })
            .take(limit)
            .collect())
    }

    async fn send_message(&mut self, peer_id: PeerId, text: &str) -> Result<(), ChannelError> {
        if !self.connected {
            return Err(ChannelError("not connected".to_string()));
        }

        let message = direct_message(self.me, text);
        self.outgoing
            .send(message)
            .map_err(|_| ChannelError(format!("peer {peer_id} hung up")))
    }

    async fn next_event(&mut self) -> Option<InboundMessage> {
        self.incoming.recv().await
    }
}

/// Direct-chat message as the recipient sees it.
pub fn direct_message(sender_id: PeerId, text: &str) -> InboundMessage {
    InboundMessage {
        sender_id,
        text: text.to_string(),
        is_group: false,
        chat: Dialog { peer_id: sender_id, title: format!("user {sender_id}") },
    }
}

/// Group-chat message as the recipient sees it.
pub fn group_message(sender_id: PeerId, group_id: PeerId, text: &str) -> InboundMessage {
    InboundMessage {
        sender_id,
        text: text.to_string(),
        is_group: true,
        chat: Dialog { peer_id: group_id, title: format!("group {group_id}") },
    }
}

/// Session type used by the file-backed fixtures.
pub type FileSession = Session<RedbKeyStore, MemoryDirectory, SystemEnv>;

/// A user with identity files and a key store under `dir`, published to
/// `directory`.
pub async fn file_party(dir: &Path, id: i64, directory: &MemoryDirectory) -> (PeerId, FileSession) {
    let peer_id = PeerId::new(id);
    let session = open_session(dir, directory);

    directory.publish_public_key(peer_id, session.identity().public_key()).await.unwrap();
    (peer_id, session)
}

/// Reopen a party's identity and key store from `dir`.
pub fn open_session(dir: &Path, directory: &MemoryDirectory) -> FileSession {
    let env = SystemEnv::new();
    let identity: Arc<Identity> = Arc::new(load_or_create(dir, &env).unwrap());
    let store = RedbKeyStore::open(dir.join("key_store.redb")).unwrap();

    Session::new(identity, store, directory.clone(), env)
}
