//! Providers module - the LLM boundary.
//!
//! This module defines the `LLMProvider` trait the agent engine calls and
//! the types crossing that boundary. Concrete providers (OpenAI-compatible
//! gateways, Anthropic, local runtimes) live outside this crate and
//! implement the trait; the engine only requires `chat`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ferrobot::providers::{ChatOptions, LLMProvider};
//! use ferrobot::session::SessionMessage;
//!
//! async fn example(provider: &dyn LLMProvider) {
//!     let messages = vec![SessionMessage::user("Hello!")];
//!     let options = ChatOptions::new().with_max_tokens(1000);
//!     let response = provider
//!         .chat(&messages, &[], "any-model", options)
//!         .await
//!         .unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

mod types;

pub use types::{
    ChatOptions, ContentPart, ImageUrl, LLMResponse, ToolCallRequest, ToolDefinition,
};

use crate::error::Result;
use crate::session::SessionMessage;
use async_trait::async_trait;

/// Trait for LLM chat providers.
///
/// A provider must tolerate an empty tool-definition list and must return
/// either a plain answer (empty `tool_calls`) or a batch of tool calls the
/// engine fully satisfies before calling `chat` again. The engine does not
/// impose a timeout on this call; any network timeout belongs to the
/// provider implementation.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat request and return the model's response.
    async fn chat(
        &self,
        messages: &[SessionMessage],
        tools: &[ToolDefinition],
        model: &str,
        options: ChatOptions,
    ) -> Result<LLMResponse>;

    /// Model id used when the caller does not configure one.
    fn default_model(&self) -> &str;
}
