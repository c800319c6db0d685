//! Messaging transport abstraction.
//!
//! The overlay rides on an existing text-messaging network. The transport
//! only moves text: authentication, dialog listing and delivery belong to
//! the network's own client library.

use std::future::Future;

use hushwire_core::PeerId;

/// A conversation the local user takes part in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    /// Chat id (a user for direct chats, a group otherwise)
    pub peer_id: PeerId,
    /// Display name
    pub title: String,
}

/// A text message delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Author of the message; selects the session key
    pub sender_id: PeerId,
    /// Message body as received
    pub text: String,
    /// Whether the message was posted in a group chat
    pub is_group: bool,
    /// Chat the message was posted in
    pub chat: Dialog,
}

/// Abstracts the underlying messaging network.
///
/// # Implementations
///
/// - **Production**: a bridge to the messaging network's client library
/// - **Tests**: an in-memory channel pair
pub trait Transport: Send {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connect and authenticate.
    fn connect(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Most recent dialogs, newest first, at most `limit`.
    fn dialogs(
        &mut self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Dialog>, Self::Error>> + Send;

    /// Send a text message to a chat.
    fn send_message(
        &mut self,
        peer_id: PeerId,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Wait for the next inbound message.
    ///
    /// Returns `None` once the transport is closed. Must be cancel safe: the
    /// runtime drops a pending call when an outgoing message is queued.
    fn next_event(&mut self) -> impl Future<Output = Option<InboundMessage>> + Send;
}
