//! Runtime tests over the in-memory transport.

mod common;

use std::sync::Arc;

use common::{ChannelTransport, direct_message, file_party, group_message, transport_pair};
use hushwire_client::{
    ClientError, Identity, InboxEvent, MemoryDirectory, OutgoingMessage, Publication, Runtime,
    Session, SystemEnv,
};
use hushwire_core::{
    PeerId, StorageError,
    storage::{ChaoticKeyStore, MemoryKeyStore},
};
use tempfile::tempdir;
use tokio::sync::mpsc;

/// Outbox whose sender is already gone, for runtimes that only receive.
fn idle_outbox() -> mpsc::Receiver<OutgoingMessage> {
    mpsc::channel(1).1
}

fn outgoing(peer_id: PeerId, text: &str) -> OutgoingMessage {
    OutgoingMessage { peer_id, text: text.to_string() }
}

async fn drain(mut rx: mpsc::Receiver<InboxEvent>) -> Vec<InboxEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn messages_flow_between_runtimes() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();

    let (alice_id, alice_session) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, bob_session) = file_party(bob_dir.path(), 2, &directory).await;
    let (alice_transport, bob_transport) = transport_pair(alice_id, bob_id);

    let mut alice = Runtime::new(alice_transport, alice_session);
    let mut bob = Runtime::new(bob_transport, bob_session);
    alice.start(alice_id).await.unwrap();
    bob.start(bob_id).await.unwrap();

    alice.send(bob_id, "hello").await.unwrap();
    alice.send(bob_id, "how are you?").await.unwrap();
    drop(alice);

    let (tx, rx) = mpsc::channel(16);
    bob.run(idle_outbox(), tx).await.unwrap();

    let texts: Vec<String> = drain(rx)
        .await
        .into_iter()
        .map(|event| match event {
            InboxEvent::Message { sender_id, text, .. } => {
                assert_eq!(sender_id, alice_id);
                text
            },
            other => panic!("unexpected event: {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["hello", "how are you?"]);
}

#[tokio::test]
async fn start_publishes_missing_key() {
    let dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let me = PeerId::new(5);
    let session = common::open_session(dir.path(), &directory);
    let (transport, _inject, _out) = ChannelTransport::detached(me);

    let mut runtime = Runtime::new(transport, session);

    assert_eq!(runtime.start(me).await.unwrap(), Some(Publication::Published));
    assert_eq!(directory.publish_count(), 1);
}

#[tokio::test]
async fn start_survives_offline_directory() {
    let dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    directory.set_offline(true);
    let me = PeerId::new(5);
    let session = common::open_session(dir.path(), &directory);
    let (transport, _inject, _out) = ChannelTransport::detached(me);

    let mut runtime = Runtime::new(transport, session);

    assert_eq!(runtime.start(me).await.unwrap(), None);
}

#[tokio::test]
async fn send_before_start_is_transport_error() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice_session) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, _) = file_party(bob_dir.path(), 2, &directory).await;
    let (transport, _inject, _out) = ChannelTransport::detached(alice_id);

    let mut runtime = Runtime::new(transport, alice_session);
    let result = runtime.send(bob_id, "too early").await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert!(result.unwrap_err().is_transient());
}

#[tokio::test]
async fn unreadable_message_does_not_stop_the_loop() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, bob_session) = file_party(bob_dir.path(), 2, &directory).await;

    let (transport, inject, _out) = ChannelTransport::detached(bob_id);
    let mut bob = Runtime::new(transport, bob_session);
    bob.start(bob_id).await.unwrap();

    let valid = alice.prepare_outgoing(bob_id, "still here").await.unwrap();
    inject.send(direct_message(alice_id, "plain text, not ciphertext")).unwrap();
    inject.send(direct_message(PeerId::new(999), "from someone never published")).unwrap();
    inject.send(direct_message(alice_id, "   ")).unwrap();
    inject.send(direct_message(alice_id, valid.as_str())).unwrap();
    drop(inject);

    let (tx, rx) = mpsc::channel(16);
    bob.run(idle_outbox(), tx).await.unwrap();
    let events = drain(rx).await;

    assert_eq!(events.len(), 3, "empty message is skipped: {events:?}");
    assert!(matches!(
        &events[0],
        InboxEvent::Unreadable { sender_id, .. } if *sender_id == alice_id
    ));
    assert!(matches!(
        &events[1],
        InboxEvent::Unreadable { sender_id, .. } if *sender_id == PeerId::new(999)
    ));
    assert!(matches!(&events[2], InboxEvent::Message { text, .. } if text == "still here"));
}

#[tokio::test]
async fn group_message_keeps_chat_descriptor() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, bob_session) = file_party(bob_dir.path(), 2, &directory).await;
    let group = PeerId::new(-100_123);

    let (transport, inject, _out) = ChannelTransport::detached(bob_id);
    let mut bob = Runtime::new(transport, bob_session);

    let encoded = alice.prepare_outgoing(bob_id, "hi group").await.unwrap();
    inject.send(group_message(alice_id, group, encoded.as_str())).unwrap();
    drop(inject);

    let (tx, rx) = mpsc::channel(4);
    bob.run(idle_outbox(), tx).await.unwrap();
    let events = drain(rx).await;

    assert!(matches!(
        &events[..],
        [InboxEvent::Message { sender_id, chat, is_group: true, text }]
            if *sender_id == alice_id && chat.peer_id == group && text == "hi group"
    ));
}

#[tokio::test]
async fn storage_failure_stops_the_loop() {
    let directory = MemoryDirectory::new();
    let env = SystemEnv::new();
    let me = PeerId::new(2);
    let identity = Arc::new(Identity::generate(&env).unwrap());
    let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0);
    let session = Session::new(identity, store, directory, env);

    let (transport, inject, _out) = ChannelTransport::detached(me);
    let mut runtime = Runtime::new(transport, session);
    inject.send(direct_message(PeerId::new(1), "anything")).unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let result = runtime.run(idle_outbox(), tx).await;

    assert!(matches!(result, Err(ClientError::Storage(StorageError::Io(_)))));
}

#[tokio::test]
async fn dialogs_come_from_transport() {
    let directory = MemoryDirectory::new();
    let dir = tempdir().unwrap();
    let (alice_id, session) = file_party(dir.path(), 1, &directory).await;
    let (transport, _other) = transport_pair(alice_id, PeerId::new(2));

    let mut runtime = Runtime::new(transport, session);

    let dialogs = runtime.dialogs(15).await.unwrap();
    assert_eq!(dialogs.len(), 1);
    assert_eq!(dialogs[0].peer_id, PeerId::new(2));
    assert!(runtime.dialogs(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn sends_while_receive_loop_runs() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice_session) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, bob_session) = file_party(bob_dir.path(), 2, &directory).await;
    let (alice_transport, bob_transport) = transport_pair(alice_id, bob_id);

    let mut alice = Runtime::new(alice_transport, alice_session);
    let mut bob = Runtime::new(bob_transport, bob_session);
    alice.start(alice_id).await.unwrap();
    bob.start(bob_id).await.unwrap();

    let (alice_outbox, alice_queue) = mpsc::channel(4);
    let (alice_sink, mut alice_inbox) = mpsc::channel(4);
    let alice_loop = tokio::spawn(async move { alice.run(alice_queue, alice_sink).await });

    let (bob_outbox, bob_queue) = mpsc::channel(4);
    let (bob_sink, mut bob_inbox) = mpsc::channel(4);
    let bob_loop = tokio::spawn(async move { bob.run(bob_queue, bob_sink).await });

    alice_outbox.send(outgoing(bob_id, "ping")).await.unwrap();
    assert!(matches!(
        bob_inbox.recv().await.unwrap(),
        InboxEvent::Message { sender_id, text, .. } if sender_id == alice_id && text == "ping"
    ));

    bob_outbox.send(outgoing(alice_id, "pong")).await.unwrap();
    assert!(matches!(
        alice_inbox.recv().await.unwrap(),
        InboxEvent::Message { sender_id, text, .. } if sender_id == bob_id && text == "pong"
    ));

    alice_loop.abort();
    bob_loop.abort();
}

#[tokio::test]
async fn failed_send_is_reported_with_its_text() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice_session) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, _) = file_party(bob_dir.path(), 2, &directory).await;

    // Never started, so the transport refuses to send
    let (transport, inject, _out) = ChannelTransport::detached(alice_id);
    let mut alice = Runtime::new(transport, alice_session);

    let (outbox, queue) = mpsc::channel(4);
    outbox.send(outgoing(bob_id, "lost?")).await.unwrap();
    drop(outbox);
    drop(inject);

    let (tx, rx) = mpsc::channel(4);
    alice.run(queue, tx).await.unwrap();
    let events = drain(rx).await;

    assert!(matches!(
        &events[..],
        [InboxEvent::SendFailed { peer_id, text, transient: true, .. }]
            if *peer_id == bob_id && text == "lost?"
    ));
}

#[tokio::test]
async fn directory_outage_defers_message() {
    let alice_dir = tempdir().unwrap();
    let bob_dir = tempdir().unwrap();
    let directory = MemoryDirectory::new();
    let (alice_id, alice) = file_party(alice_dir.path(), 1, &directory).await;
    let (bob_id, bob_session) = file_party(bob_dir.path(), 2, &directory).await;

    let encoded = alice.prepare_outgoing(bob_id, "worth keeping").await.unwrap();
    directory.set_offline(true);

    let (transport, inject, _out) = ChannelTransport::detached(bob_id);
    let mut bob = Runtime::new(transport, bob_session);
    inject.send(direct_message(alice_id, encoded.as_str())).unwrap();
    drop(inject);

    let (tx, rx) = mpsc::channel(4);
    bob.run(idle_outbox(), tx).await.unwrap();
    let events = drain(rx).await;

    let [InboxEvent::Deferred { sender_id, encoded: deferred, is_group: false, .. }] = &events[..]
    else {
        panic!("expected one deferred message: {events:?}");
    };
    assert_eq!(*sender_id, alice_id);
    assert_eq!(deferred, &encoded);

    directory.set_offline(false);
    let text = bob.session().handle_incoming(alice_id, deferred).await.unwrap();
    assert_eq!(text, "worth keeping");
}
