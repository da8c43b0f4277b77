//! Channel trait and message types.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::wizard::Keyboard;

/// The payload of an inbound answer event. The transport classifies it
/// before dispatch: free text from a typed message, a choice value from the
/// channel's constrained input mechanism (e.g. an inline button tap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Choice(String),
}

/// An inbound message from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel name ("telegram", "cli", ...).
    pub channel: String,
    /// Stable identity of the sender within the channel.
    pub sender: String,
    pub payload: Payload,
    /// Display name, if the channel knows one.
    pub sender_name: Option<String>,
    /// Channel-specific routing data (e.g. Telegram chat_id).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: impl Into<String>, sender: impl Into<String>, payload: Payload) -> Self {
        Self {
            channel: channel.into(),
            sender: sender.into(),
            payload,
            sender_name: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}

/// A document artifact to deliver to the user.
#[derive(Debug, Clone)]
pub struct OutgoingDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// An outbound response on a channel.
#[derive(Debug, Clone)]
pub struct OutgoingResponse {
    pub content: String,
    pub keyboard: Option<Keyboard>,
    pub document: Option<OutgoingDocument>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            keyboard: None,
            document: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_document(mut self, document: OutgoingDocument) -> Self {
        self.document = Some(document);
        self
    }
}

/// Stream of inbound messages produced by a running channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport. Channels guarantee payload classification
/// (text vs. choice) and sender identity; everything else is the
/// dispatcher's business.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening; returns the stream of inbound messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a response back to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
