//! Core tool types: the `Tool` trait and the `ToolContext` passed to
//! every invocation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// Trait that all tools must implement.
///
/// Tools are executable functions the model can call during a turn.
/// Execution is infallible at the type level: a tool reports failure by
/// returning a string starting with `Error:`, which flows back to the
/// model as an ordinary tool result it can react to.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use ferrobot::tools::{Tool, ToolContext};
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Reply with pong" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({
///             "type": "object",
///             "properties": {},
///             "required": []
///         })
///     }
///     async fn execute(&self, _args: &HashMap<String, String>, _ctx: &ToolContext) -> String {
///         "pong".to_string()
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry. This is the name the model
    /// uses when requesting the call.
    fn name(&self) -> &str;

    /// Description sent to the model so it knows when to use the tool.
    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// All argument values arrive as strings; tools parse what they need.
    /// Failures are reported as `Error: ...` strings rather than panics
    /// or Result errors.
    async fn execute(&self, args: &HashMap<String, String>, ctx: &ToolContext) -> String;
}

/// Context provided to tools during execution.
///
/// Carries where the triggering message came from, so tools like
/// `message` can default their target to the active conversation.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The channel the current turn originated from (e.g. "telegram", "cli").
    pub channel: Option<String>,
    /// The chat/conversation ID within the channel.
    pub chat_id: Option<String>,
    /// The session key of the conversation driving this turn.
    pub session_key: Option<String>,
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the originating channel and chat ID.
    ///
    /// # Example
    /// ```
    /// use ferrobot::tools::ToolContext;
    ///
    /// let ctx = ToolContext::new().with_channel("telegram", "123456");
    /// assert_eq!(ctx.channel.as_deref(), Some("telegram"));
    /// assert_eq!(ctx.chat_id.as_deref(), Some("123456"));
    /// ```
    pub fn with_channel(mut self, channel: &str, chat_id: &str) -> Self {
        self.channel = Some(channel.to_string());
        self.chat_id = Some(chat_id.to_string());
        self
    }

    /// Set the session key of the driving conversation.
    pub fn with_session_key(mut self, session_key: &str) -> Self {
        self.session_key = Some(session_key.to_string());
        self
    }
}
