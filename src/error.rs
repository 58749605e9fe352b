//! Error types for Ferrobot
//!
//! This module defines all error types used throughout the Ferrobot gateway.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for Ferrobot operations.
#[derive(Error, Debug)]
pub enum FerroError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider errors (API failures, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Channel adapter errors (delivery failures, unknown channels, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(String),

    /// Session management errors
    #[error("Session error: {0}")]
    Session(String),

    /// Memory store errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// Sandbox execution errors (spawn failures, capture-file IO, etc.)
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// IO errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message bus errors (queue closed, buffer full)
    #[error("Message bus closed")]
    BusClosed,

    /// Command rejected by the sandbox deny-list
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// Generic not-found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Convenience result type alias for Ferrobot operations.
pub type Result<T> = std::result::Result<T, FerroError>;
