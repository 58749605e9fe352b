//! Agent module - the turn engine.
//!
//! This module contains the pieces that turn an inbound message into a
//! reply:
//!
//! - [`AgentLoop`]: consumes the bus, drives the model/tool iteration
//!   loop, and publishes replies
//! - [`ContextBuilder`]: assembles the system prompt and message list
//! - memory directives: extraction and stripping of
//!   `<ferrobot_memory>` blocks from model output
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferrobot::agent::AgentLoop;
//! use ferrobot::bus::MessageBus;
//! use ferrobot::config::Config;
//! use ferrobot::session::SessionManager;
//!
//! let bus = Arc::new(MessageBus::new());
//! let agent = AgentLoop::new(Config::default(), bus, provider, SessionManager::new()?)?;
//! tokio::spawn(async move { agent.run().await });
//! ```

mod context;
mod directives;
mod r#loop;

pub use context::ContextBuilder;
pub use directives::{extract_memory_block, normalize_memory_lines, strip_memory_block};
pub use r#loop::{AgentLoop, METADATA_SUPPORTS_TYPING};
