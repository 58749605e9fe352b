//! Deny-list policy gating sandboxed command execution.
//!
//! A textual pattern match over the raw command string, applied before any
//! process is spawned. This is a defense-in-depth tripwire against obviously
//! destructive or privilege-escalating commands, not a sandbox guarantee: a
//! determined command can evade substring matching, and anything stronger
//! belongs to an OS-level sandbox, not this gate.

/// Substrings that reject a command outright.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    // Destructive file operations
    "rm -rf",
    "rm -r",
    "mkfs",
    "dd ",
    // Machine lifecycle
    "shutdown",
    "reboot",
    // Fork bomb
    ":(){:|:&};:",
    // Privilege elevation
    "sudo ",
    "su ",
    // Process mass-kill
    "kill -9",
    "killall",
    // Mass permission/ownership changes
    "chmod 777",
    "chown",
    // Pipe-to-shell installers
    "curl | sh",
    "wget | sh",
];

/// Deny-list policy for the sandbox executor.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    /// Commands containing any of these substrings are rejected
    pub blocked_patterns: Vec<String>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            blocked_patterns: DEFAULT_BLOCKED_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SandboxPolicy {
    /// A policy that blocks nothing. For trusted embeddings and tests only.
    pub fn permissive() -> Self {
        Self {
            blocked_patterns: Vec::new(),
        }
    }

    /// Add a blocked pattern (builder pattern).
    pub fn block_pattern(mut self, pattern: &str) -> Self {
        self.blocked_patterns.push(pattern.to_string());
        self
    }

    /// Returns the first matching deny-list pattern, if any.
    pub fn violation(&self, command: &str) -> Option<&str> {
        self.blocked_patterns
            .iter()
            .find(|p| command.contains(p.as_str()))
            .map(String::as_str)
    }

    /// True when the command passes the deny-list.
    pub fn allows(&self, command: &str) -> bool {
        self.violation(command).is_none()
    }
}
