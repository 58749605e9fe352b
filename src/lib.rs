//! Ferrobot - personal automation gateway.
//!
//! A message bus, a bounded agent turn engine, a tool dispatch layer,
//! and a sandboxed command executor. Channel adapters and LLM
//! providers plug in from outside through the [`bus::OutboundHandler`]
//! and [`providers::LLMProvider`] traits.

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod sandbox;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{AgentLoop, ContextBuilder};
pub use bus::{InboundMessage, MessageBus, OutboundHandler, OutboundMessage};
pub use config::Config;
pub use error::{FerroError, Result};
pub use providers::{ChatOptions, LLMProvider, LLMResponse, ToolCallRequest, ToolDefinition};
pub use sandbox::{ExecResult, SandboxExecutor, SandboxPolicy};
pub use session::{Role, Session, SessionManager, SessionMessage};
pub use tools::{Tool, ToolContext, ToolRegistry};
