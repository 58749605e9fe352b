//! Tool definitions and dispatch for model function calling.
//!
//! - [`Tool`] trait: the interface every tool implements
//! - [`ToolContext`]: per-invocation context (channel, chat, session)
//! - [`ToolRegistry`]: registration and name-based dispatch
//!
//! # Built-in tools
//!
//! - [`MessageTool`]: send a message to the user through the bus
//! - [`ShellTool`]: run a sandboxed shell command
//! - [`SpawnTool`]: run a sandboxed command in the background
//! - [`EchoTool`]: diagnostic echo, mostly used in tests
//!
//! Tool execution is infallible at the type level: failures come back
//! as strings starting with `Error:` so the model can read and react
//! to them like any other result.

pub mod message;
mod registry;
pub mod shell;
pub mod spawn;
mod types;

pub use message::MessageTool;
pub use registry::{empty_parameters, ToolRegistry};
pub use shell::ShellTool;
pub use spawn::SpawnTool;
pub use types::{Tool, ToolContext};

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

/// Simple echo tool for testing.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the provided message"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, args: &HashMap<String, String>, _ctx: &ToolContext) -> String {
        args.get("message").cloned().unwrap_or_default()
    }
}
