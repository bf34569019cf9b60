//! Chat message envelopes and outbound delivery
//!
//! Transport details live outside this crate. Inbound messages arrive as
//! [`IncomingMessage`]; replies leave through an [`Outbox`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use tokio::sync::mpsc;

/// Kind of account that sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    User,
    Bot,
    System,
}

/// A message posted to the group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub user_id: String,
    /// Display name of the sender
    pub name: String,
    #[serde(default)]
    pub sender_type: SenderType,
    pub text: String,
}

impl IncomingMessage {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            sender_type: SenderType::User,
            text: text.into(),
        }
    }

    pub fn with_sender_type(mut self, sender_type: SenderType) -> Self {
        self.sender_type = sender_type;
        self
    }

    pub fn is_automated(&self) -> bool {
        self.sender_type == SenderType::Bot
    }
}

/// A reply for the group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<String> for OutgoingMessage {
    fn from(text: String) -> Self {
        Self { text }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Outbox closed")]
    Closed,
}

/// Where replies go
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Deliver a batch of replies produced by one command, in order.
    async fn deliver(&self, messages: Vec<OutgoingMessage>) -> Result<(), DeliveryError>;
}

/// Writes each reply as one JSON line on stdout
#[derive(Debug, Default)]
pub struct StdoutOutbox;

#[async_trait]
impl Outbox for StdoutOutbox {
    async fn deliver(&self, messages: Vec<OutgoingMessage>) -> Result<(), DeliveryError> {
        let mut lines = Vec::new();
        for message in &messages {
            serde_json::to_writer(&mut lines, message)?;
            lines.push(b'\n');
        }
        // One locked write per batch so concurrent commands don't interleave.
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&lines)?;
        handle.flush()?;
        Ok(())
    }
}

/// Forwards reply batches into a channel
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    tx: mpsc::UnboundedSender<Vec<OutgoingMessage>>,
}

impl ChannelOutbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<OutgoingMessage>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Outbox for ChannelOutbox {
    async fn deliver(&self, messages: Vec<OutgoingMessage>) -> Result<(), DeliveryError> {
        self.tx.send(messages).map_err(|_| DeliveryError::Closed)
    }
}
