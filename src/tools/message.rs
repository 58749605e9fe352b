//! Message tool: lets the model send a message to the user mid-turn.
//!
//! Publishing goes through the bus, so delivery happens via whatever
//! outbound handlers are subscribed for the target channel. The agent
//! loop watches for calls to this tool and suppresses its own final
//! reply when one fired, so the user is not messaged twice.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::bus::{MessageBus, OutboundMessage};

use super::{Tool, ToolContext};

/// Tool for sending a message to the user.
///
/// # Parameters
/// - `content`: the message text (required)
/// - `channel`: target channel, defaults to the originating channel
/// - `chat_id`: target chat, defaults to the originating chat
pub struct MessageTool {
    bus: Arc<MessageBus>,
}

impl MessageTool {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Tool for MessageTool {
    fn name(&self) -> &str {
        "message"
    }

    fn description(&self) -> &str {
        "Send a message to the user. Use this to reply or to notify proactively."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The message text to send"
                },
                "channel": {
                    "type": "string",
                    "description": "Target channel (defaults to the current one)"
                },
                "chat_id": {
                    "type": "string",
                    "description": "Target chat ID (defaults to the current one)"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, args: &HashMap<String, String>, ctx: &ToolContext) -> String {
        let content = match args.get("content") {
            Some(c) if !c.trim().is_empty() => c.clone(),
            _ => return "Error: content is required".to_string(),
        };

        let channel = args
            .get("channel")
            .cloned()
            .or_else(|| ctx.channel.clone());
        let chat_id = args
            .get("chat_id")
            .cloned()
            .or_else(|| ctx.chat_id.clone());

        let (channel, chat_id) = match (channel, chat_id) {
            (Some(ch), Some(id)) => (ch, id),
            _ => return "Error: no target channel/chat_id".to_string(),
        };

        let msg = OutboundMessage::new(&channel, &chat_id, &content);
        match self.bus.publish_outbound(msg).await {
            Ok(()) => "Message sent".to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to publish outbound message");
                format!("Error: {}", e)
            }
        }
    }
}
