//! Channel abstraction — message I/O boundary.
//!
//! A channel delivers identity + raw text in and accepts formatted text
//! out. The advisor core is agnostic to any transport beyond the literal
//! button-label strings it recognizes as intents.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// An inbound message from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel name ("telegram", "cli", ...).
    pub channel: String,
    /// Stable sender identity within the channel.
    pub sender_id: String,
    /// Display name, if the channel provides one.
    pub user_name: Option<String>,
    /// Raw message text.
    pub content: String,
    /// Channel-specific metadata (e.g. Telegram chat_id).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, sender_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            user_name: None,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            received_at: Utc::now(),
        }
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An outbound response to a channel.
#[derive(Debug, Clone)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Stream of inbound messages produced by a running channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport the advisor can listen on and respond through.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging and routing.
    fn name(&self) -> &str;

    /// Start listening; returns the stream of inbound messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a response to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;
}
