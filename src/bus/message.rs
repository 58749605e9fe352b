//! Message types for the Ferrobot message bus
//!
//! This module defines the core message types used for communication
//! between channel adapters, the agent engine, and scheduled triggers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key adapters translate into a non-text liveness signal.
pub const METADATA_ACTION: &str = "action";
/// Metadata action value for the typing indicator.
pub const ACTION_TYPING: &str = "typing";

/// Represents an incoming message from a channel adapter or a system trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The channel this message came from (e.g., "telegram", "system")
    pub channel: String,
    /// Unique identifier of the sender
    pub sender_id: String,
    /// Unique identifier of the chat/conversation
    pub chat_id: String,
    /// The text content of the message
    pub content: String,
    /// Local file paths of attached media
    pub media: Vec<String>,
    /// Additional metadata key-value pairs
    pub metadata: HashMap<String, String>,
    /// When the message entered the bus
    pub timestamp: DateTime<Utc>,
}

/// Represents an outgoing message to be delivered by a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The channel to send this message through
    pub channel: String,
    /// The chat/conversation to send to
    pub chat_id: String,
    /// The text content to send
    pub content: String,
    /// Optional message ID to reply to
    pub reply_to: Option<String>,
    /// Local file paths of attached media
    pub media: Vec<String>,
    /// Additional metadata key-value pairs (e.g., `action=typing`)
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Creates a new inbound message with the required fields.
    ///
    /// # Example
    /// ```
    /// use ferrobot::bus::message::InboundMessage;
    ///
    /// let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello, bot!");
    /// assert_eq!(msg.session_key(), "telegram:chat456");
    /// ```
    pub fn new(channel: &str, sender_id: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            media: Vec::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// The conversation identity this message belongs to: `channel:chat_id`.
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    /// Attaches a media file path to the message (builder pattern).
    pub fn with_media(mut self, path: &str) -> Self {
        self.media.push(path.to_string());
        self
    }

    /// Adds a metadata key-value pair to the message (builder pattern).
    ///
    /// # Example
    /// ```
    /// use ferrobot::bus::message::InboundMessage;
    ///
    /// let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello")
    ///     .with_metadata("message_id", "12345");
    /// assert_eq!(msg.metadata.get("message_id"), Some(&"12345".to_string()));
    /// ```
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Checks if this message has any media attached.
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

impl OutboundMessage {
    /// Creates a new outbound message.
    pub fn new(channel: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            reply_to: None,
            media: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Creates a response addressed back to the origin of an inbound message.
    pub fn reply_to(inbound: &InboundMessage, content: &str) -> Self {
        Self::new(&inbound.channel, &inbound.chat_id, content)
    }

    /// Creates a typing liveness signal for the given chat.
    ///
    /// Adapters map the `action=typing` metadata to a non-text indicator
    /// rather than a visible message.
    pub fn typing(channel: &str, chat_id: &str) -> Self {
        Self::new(channel, chat_id, "").with_metadata(METADATA_ACTION, ACTION_TYPING)
    }

    /// Sets the message ID to reply to (builder pattern).
    pub fn with_reply(mut self, message_id: &str) -> Self {
        self.reply_to = Some(message_id.to_string());
        self
    }

    /// Attaches a media file path to the message (builder pattern).
    pub fn with_media(mut self, path: &str) -> Self {
        self.media.push(path.to_string());
        self
    }

    /// Adds a metadata key-value pair to the message (builder pattern).
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// True when this message carries only a metadata action, no text.
    pub fn is_action(&self) -> bool {
        self.content.is_empty() && self.metadata.contains_key(METADATA_ACTION)
    }
}
