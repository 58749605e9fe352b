//! Spawn tool: fire-and-forget background commands.
//!
//! The command runs through the sandbox on a detached tokio task; the
//! tool returns immediately and the outcome is only logged. Useful for
//! long-running work the model does not need to wait on.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::sandbox::SandboxExecutor;

use super::{Tool, ToolContext};

/// Timeout for background commands. Longer than the interactive shell
/// tool since nothing is waiting on the result.
const SPAWN_TIMEOUT_SECS: u64 = 60;

/// Tool for launching a background command.
///
/// # Parameters
/// - `task`: the shell command to run in the background (required)
/// - `label`: human-readable label for log lines, defaults to "task"
pub struct SpawnTool {
    working_dir: PathBuf,
}

impl SpawnTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }
}

#[async_trait]
impl Tool for SpawnTool {
    fn name(&self) -> &str {
        "spawn"
    }

    fn description(&self) -> &str {
        "Run a shell command in the background without waiting for it"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The shell command to run in the background"
                },
                "label": {
                    "type": "string",
                    "description": "Label for identifying the task in logs"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, args: &HashMap<String, String>, _ctx: &ToolContext) -> String {
        let task = match args.get("task") {
            Some(t) if !t.is_empty() => t.clone(),
            _ => return "Error: missing task".to_string(),
        };
        let label = args
            .get("label")
            .cloned()
            .unwrap_or_else(|| "task".to_string());

        let working_dir = self.working_dir.clone();
        let task_label = label.clone();
        tokio::spawn(async move {
            let executor = SandboxExecutor::new();
            match executor
                .run(&task, &working_dir, Duration::from_secs(SPAWN_TIMEOUT_SECS))
                .await
            {
                Ok(result) => {
                    info!(
                        label = %task_label,
                        exit_code = result.exit_code,
                        timed_out = result.timed_out,
                        blocked = result.blocked,
                        "Background task finished"
                    );
                }
                Err(e) => {
                    error!(label = %task_label, error = %e, "Background task failed to run");
                }
            }
        });

        format!("Spawned task: {}", label)
    }
}
