//! Configuration types for Ferrobot
//!
//! Plain serde structs with sensible defaults. The gateway does not load
//! configuration files itself; embedders construct a [`Config`] however they
//! like (file, env, flags) and hand it to the engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent turn-engine settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Sandbox executor settings
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Workspace root for bootstrap documents and the memory store.
    /// Defaults to `~/.ferrobot/workspace`.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

impl Config {
    /// Returns the Ferrobot home directory (`~/.ferrobot`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ferrobot")
    }

    /// Resolved workspace path.
    pub fn workspace_path(&self) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(|| Self::dir().join("workspace"))
    }
}

/// Settings for the agent turn engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model id passed to the provider; empty means the provider's default
    #[serde(default)]
    pub model: String,
    /// Max tokens per model call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on model/tool round-trips per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Raw-entry cap when loading session history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_iterations: default_max_iterations(),
            history_limit: default_history_limit(),
        }
    }
}

/// Settings for the sandbox executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Default timeout for shell-tool commands, in seconds
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sandbox_timeout(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable text
    Compact,
    /// Structured JSON lines for log aggregators
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (e.g. "info", "ferrobot=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_iterations() -> usize {
    10
}

fn default_history_limit() -> usize {
    crate::session::DEFAULT_HISTORY_LIMIT
}

fn default_sandbox_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
