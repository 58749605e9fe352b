//! Sandbox module - bounded-risk shell command execution
//!
//! The `SandboxExecutor` runs a shell command as a child process with a
//! deny-list policy gate, an environment allow-list, timeout escalation
//! (SIGTERM, short grace, SIGKILL), and temp-file output capture. Each
//! invocation is self-contained (own capture files, own child), so the
//! executor is safe to call concurrently without additional locking.

pub mod policy;

pub use policy::{SandboxPolicy, DEFAULT_BLOCKED_PATTERNS};

use crate::error::{FerroError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Grace period between SIGTERM and SIGKILL on timeout.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Exit code sentinel when the child never reported a status.
const EXIT_UNKNOWN: i32 = 124;

/// Environment variables the child inherits; everything else is dropped.
const ENV_ALLOWLIST: &[&str] = &[
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Outcome of one sandboxed command invocation. Never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecResult {
    /// Exit code of the command; `128 + signal` for signal-terminated exits
    pub exit_code: i32,
    /// True when the timeout escalation path was taken
    pub timed_out: bool,
    /// True when the deny-list rejected the command before spawning
    pub blocked: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecResult {
    /// True for a clean, untimed, unblocked zero exit.
    pub fn success(&self) -> bool {
        !self.blocked && !self.timed_out && self.exit_code == 0
    }
}

/// Executes shell commands with bounded risk.
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    policy: SandboxPolicy,
}

impl SandboxExecutor {
    /// Create an executor with the default deny-list policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with a custom policy.
    pub fn with_policy(policy: SandboxPolicy) -> Self {
        Self { policy }
    }

    /// Run `command` through `sh -c` in `working_dir`, bounded by `timeout`.
    ///
    /// The policy gate runs first: a deny-listed command returns
    /// `blocked=true` immediately and spawns no process. Otherwise the child
    /// runs with only the proxy-variable allow-list in its environment and
    /// stdout/stderr captured to temporary files (removed unconditionally
    /// when the capture handles drop).
    ///
    /// On timeout the child receives SIGTERM, a 2-second grace wait, then
    /// SIGKILL; `timed_out` is set whenever that path was taken.
    ///
    /// # Errors
    /// Returns an error only for executor-internal failures (spawn or
    /// capture-file IO). Policy blocks and timeouts are in-band results.
    pub async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<ExecResult> {
        if let Some(pattern) = self.policy.violation(command) {
            warn!(pattern = %pattern, "command blocked by policy");
            return Ok(ExecResult {
                exit_code: -1,
                blocked: true,
                stdout: "Error: command blocked by policy".to_string(),
                ..Default::default()
            });
        }

        let stdout_capture = NamedTempFile::with_prefix("ferrobot_stdout_")
            .map_err(|e| FerroError::Sandbox(format!("capture file: {}", e)))?;
        let stderr_capture = NamedTempFile::with_prefix("ferrobot_stderr_")
            .map_err(|e| FerroError::Sandbox(format!("capture file: {}", e)))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_capture.reopen()?))
            .stderr(Stdio::from(stderr_capture.reopen()?));
        for key in ENV_ALLOWLIST {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| FerroError::Sandbox(format!("exec failed: {}", e)))?;

        let mut timed_out = false;
        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                timed_out = true;
                debug!(command = %command, "command timed out, escalating");
                terminate(&mut child).await?
            }
        };

        let exit_code = match status {
            Some(status) => exit_code_of(status),
            None => EXIT_UNKNOWN,
        };

        let stdout = tokio::fs::read_to_string(stdout_capture.path())
            .await
            .unwrap_or_default();
        let stderr = tokio::fs::read_to_string(stderr_capture.path())
            .await
            .unwrap_or_default();

        Ok(ExecResult {
            exit_code,
            timed_out,
            blocked: false,
            stdout,
            stderr,
        })
    }
}

/// Graceful-then-forced termination of a timed-out child.
///
/// SIGTERM first; if the child is still alive after the grace period, SIGKILL.
async fn terminate(child: &mut Child) -> Result<Option<std::process::ExitStatus>> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        if let Ok(status) = tokio::time::timeout(TERM_GRACE, child.wait()).await {
            return Ok(Some(status?));
        }
    }
    // SIGKILL (kill() also reaps the child).
    child.kill().await?;
    Ok(child.try_wait()?)
}

#[cfg(unix)]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => status.signal().map(|s| 128 + s).unwrap_or(EXIT_UNKNOWN),
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn executor() -> SandboxExecutor {
        SandboxExecutor::new()
    }

    #[tokio::test]
    async fn test_simple_command_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let result = executor()
            .run("echo hello", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_stderr_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let result = executor()
            .run("echo oops >&2; exit 3", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr.trim(), "oops");
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let result = executor()
            .run("cat marker.txt", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.stdout, "here");
    }

    #[tokio::test]
    async fn test_blocked_command_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        // A blocked command that would leave a file behind if it ran.
        let result = executor()
            .run("sudo touch evidence.txt", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.blocked);
        assert!(!result.timed_out);
        assert_eq!(result.stdout, "Error: command blocked by policy");
        assert!(!dir.path().join("evidence.txt").exists());
    }

    #[tokio::test]
    async fn test_timeout_sets_flag_and_kills_child() {
        let dir = TempDir::new().unwrap();
        let start = Instant::now();
        let result = executor()
            .run("sleep 30", dir.path(), Duration::from_millis(200))
            .await
            .unwrap();

        assert!(result.timed_out);
        // SIGTERM path: well under the sleep duration.
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_escalates_past_sigterm_trap() {
        let dir = TempDir::new().unwrap();
        let start = Instant::now();
        // Child ignores SIGTERM; only SIGKILL ends it.
        let result = executor()
            .run(
                "trap '' TERM; sleep 30",
                dir.path(),
                Duration::from_millis(200),
            )
            .await
            .unwrap();

        assert!(result.timed_out);
        // 200ms timeout + 2s grace + SIGKILL, with margin.
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_signal_exit_maps_to_128_plus_signal() {
        let dir = TempDir::new().unwrap();
        let result = executor()
            .run("kill -TERM $$", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        // SIGTERM is 15.
        assert_eq!(result.exit_code, 128 + 15);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_env_is_scrubbed() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("FERROBOT_SECRET_FOR_TEST", "leak");
        let result = executor()
            .run(
                "echo \"${FERROBOT_SECRET_FOR_TEST:-unset}\"",
                dir.path(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        std::env::remove_var("FERROBOT_SECRET_FOR_TEST");
        assert_eq!(result.stdout.trim(), "unset");
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_isolated() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let exec = executor();

        let (a, b) = tokio::join!(
            exec.run("echo first", dir1.path(), Duration::from_secs(5)),
            exec.run("echo second", dir2.path(), Duration::from_secs(5)),
        );
        assert_eq!(a.unwrap().stdout.trim(), "first");
        assert_eq!(b.unwrap().stdout.trim(), "second");
    }

    #[tokio::test]
    async fn test_permissive_policy() {
        let dir = TempDir::new().unwrap();
        let exec = SandboxExecutor::with_policy(SandboxPolicy::permissive());
        // "sudo" in a plain echo argument; permissive policy lets it run.
        let result = exec
            .run("echo sudo ", dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!result.blocked);
        assert_eq!(result.stdout.trim(), "sudo");
    }
}
