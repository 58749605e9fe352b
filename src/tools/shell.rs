//! Shell tool backed by the sandbox executor.
//!
//! Commands run through [`SandboxExecutor`] so they inherit the policy
//! deny list, the scrubbed environment, and the timeout escalation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::sandbox::{ExecResult, SandboxExecutor};

use super::{Tool, ToolContext};

/// Default command timeout when the model does not pass one.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Tool for executing shell commands inside the sandbox.
///
/// # Parameters
/// - `command`: the shell command to execute (required)
/// - `timeout`: timeout in seconds, defaults to 10 (optional)
pub struct ShellTool {
    executor: SandboxExecutor,
    working_dir: PathBuf,
    default_timeout: Duration,
}

impl ShellTool {
    /// Create a shell tool running in `working_dir` with the default policy.
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            executor: SandboxExecutor::new(),
            working_dir,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create a shell tool with a custom executor.
    pub fn with_executor(executor: SandboxExecutor, working_dir: PathBuf) -> Self {
        Self {
            executor,
            working_dir,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the default timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn format_result(result: &ExecResult) -> String {
        if result.timed_out {
            return "Error: command timed out".to_string();
        }
        if result.exit_code == 0 {
            return if result.stdout.is_empty() {
                "(no output)".to_string()
            } else {
                result.stdout.clone()
            };
        }
        // Blocked commands carry their error in stdout and fall through here.
        if !result.stderr.is_empty() {
            let mut out = format!("[stderr]\n{}", result.stderr);
            if !result.stdout.is_empty() {
                out.push_str(&format!("\n[stdout]\n{}", result.stdout));
            }
            return out;
        }
        if result.stdout.is_empty() {
            "Error: command failed".to_string()
        } else {
            result.stdout.clone()
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "string",
                    "description": "Timeout in seconds (default 10)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: &HashMap<String, String>, _ctx: &ToolContext) -> String {
        let command = match args.get("command") {
            Some(c) if !c.trim().is_empty() => c,
            _ => return "Error: command is required".to_string(),
        };

        let timeout = args
            .get("timeout")
            .and_then(|t| t.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        match self.executor.run(command, &self.working_dir, timeout).await {
            Ok(result) => Self::format_result(&result),
            Err(e) => format!("Error: {}", e),
        }
    }
}
