//! Common types for the LLM provider boundary.
//!
//! The gateway is dialect-agnostic: it only requires that a provider can turn
//! a message list plus tool definitions into a response carrying either plain
//! content or tool-call requests. Wire formats belong to provider
//! implementations living outside this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Capability advertisement surfaced to the model on every call.
///
/// Distinct from the runtime [`Tool`](crate::tools::Tool): this is the
/// projection the registry rebuilds per call, so tools registered between
/// turns are picked up automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the registry key)
    pub name: String,
    /// Human/model-readable description of what the tool does
    pub description: String,
    /// JSON schema for the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// The model's request to invoke a named tool with string-valued arguments.
///
/// Structured JSON argument values are carried pre-serialized as strings and
/// parsed by the tool itself. The `id` is a foreign-key-style reference: the
/// matching tool-result message stores the same id string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Provider-assigned call identifier
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// String-valued arguments
    pub arguments: HashMap<String, String>,
}

impl ToolCallRequest {
    /// Create a new tool call request.
    pub fn new(id: &str, name: &str, arguments: HashMap<String, String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

/// One inline part of a multi-part user message (text or image).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text part
    Text {
        /// The text content
        text: String,
    },
    /// Inline image part carried as a data URL
    ImageUrl {
        /// Image reference
        image_url: ImageUrl,
    },
}

/// Image reference inside a [`ContentPart::ImageUrl`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    /// `data:` URL or remote URL of the image
    pub url: String,
}

impl ContentPart {
    /// Text part constructor.
    pub fn text(text: &str) -> Self {
        Self::Text {
            text: text.to_string(),
        }
    }

    /// Image part constructor from a ready-made URL.
    pub fn image_url(url: &str) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.to_string(),
            },
        }
    }
}

/// Decoding parameters for a chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl ChatOptions {
    /// Create default chat options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum tokens (builder pattern).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature (builder pattern).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A model response: either a plain answer or a batch of tool calls the
/// engine must satisfy before calling again.
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// Text content of the response (may accompany tool calls)
    pub content: String,
    /// Tool calls requested by the model, empty for a plain answer
    pub tool_calls: Vec<ToolCallRequest>,
    /// Provider-reported finish reason, if any
    pub finish_reason: Option<String>,
}

impl LLMResponse {
    /// True when the engine must execute tools before the next model call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition() {
        let def = ToolDefinition::new("echo", "Echo input", json!({"type": "object"}));
        assert_eq!(def.name, "echo");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["parameters"]["type"], "object");
    }

    #[test]
    fn test_tool_call_request_round_trip() {
        let mut args = HashMap::new();
        args.insert("command".to_string(), "ls".to_string());
        let call = ToolCallRequest::new("call_1", "shell", args);
        let json = serde_json::to_string(&call).unwrap();
        let back: ToolCallRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn test_content_part_serialization() {
        let part = ContentPart::image_url("data:image/png;base64,AAAA");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["url"], "data:image/png;base64,AAAA");

        let text = ContentPart::text("hello");
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["type"], "text");
    }

    #[test]
    fn test_chat_options_builder() {
        let opts = ChatOptions::new().with_max_tokens(512).with_temperature(0.2);
        assert_eq!(opts.max_tokens, Some(512));
        assert_eq!(opts.temperature, Some(0.2));
    }

    #[test]
    fn test_response_has_tool_calls() {
        let mut resp = LLMResponse::default();
        assert!(!resp.has_tool_calls());
        resp.tool_calls
            .push(ToolCallRequest::new("c1", "echo", HashMap::new()));
        assert!(resp.has_tool_calls());
    }
}
