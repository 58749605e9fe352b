//! Memory module - append-only daily note log
//!
//! The memory store lives under `<workspace>/memory`: one `MEMORY.md` for
//! long-term notes plus one `YYYY-MM-DD.md` file per day. The agent engine
//! appends model-emitted memory lines after each turn and surfaces the
//! combined context back into the system prompt.

use crate::error::Result;
use chrono::{Duration, Local};
use std::path::{Path, PathBuf};

/// File-backed memory store rooted at `<workspace>/memory`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    memory_dir: PathBuf,
}

impl MemoryStore {
    /// Create a store under the given workspace, creating the directory.
    ///
    /// # Errors
    /// Returns an error if the memory directory cannot be created.
    pub fn new(workspace: &Path) -> Result<Self> {
        let memory_dir = workspace.join("memory");
        std::fs::create_dir_all(&memory_dir)?;
        Ok(Self { memory_dir })
    }

    /// Combined memory context for the system prompt.
    ///
    /// Long-term notes and today's notes, each under its own heading;
    /// empty string when neither exists.
    pub fn context(&self) -> String {
        let mut out = String::new();

        let long_term = self.long_term();
        if !long_term.is_empty() {
            out.push_str("## Long-term Memory\n");
            out.push_str(&long_term);
            out.push_str("\n\n");
        }

        let today = self.read_today();
        if !today.is_empty() {
            out.push_str("## Today's Notes\n");
            out.push_str(&today);
            out.push('\n');
        }

        out
    }

    /// Today's notes, or empty if none were taken yet.
    pub fn read_today(&self) -> String {
        read_if_exists(&self.today_path())
    }

    /// Append to today's note file.
    ///
    /// The first write of a day gets a `# YYYY-MM-DD` header; later writes
    /// are separated from existing content by a blank-line-free newline.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn append_today(&self, content: &str) -> Result<()> {
        let path = self.today_path();
        let updated = if path.exists() {
            let existing = read_if_exists(&path);
            if existing.is_empty() {
                content.to_string()
            } else {
                format!("{}\n{}", existing, content)
            }
        } else {
            format!("# {}\n\n{}", today_date(), content)
        };
        std::fs::write(&path, updated)?;
        Ok(())
    }

    /// Long-term notes from `MEMORY.md`, or empty if absent.
    pub fn long_term(&self) -> String {
        read_if_exists(&self.long_term_path())
    }

    /// Replace the long-term notes file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_long_term(&self, content: &str) -> Result<()> {
        std::fs::write(self.long_term_path(), content)?;
        Ok(())
    }

    /// Daily notes for the last `days` days (today first), joined with a
    /// horizontal-rule separator. Days without notes are skipped.
    pub fn recent(&self, days: u32) -> String {
        let mut out = String::new();
        for i in 0..days {
            let date = date_days_ago(i as i64);
            let content = read_if_exists(&self.memory_dir.join(format!("{}.md", date)));
            if content.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str("\n\n---\n\n");
            }
            out.push_str(&content);
        }
        out
    }

    fn long_term_path(&self) -> PathBuf {
        self.memory_dir.join("MEMORY.md")
    }

    fn today_path(&self) -> PathBuf {
        self.memory_dir.join(format!("{}.md", today_date()))
    }
}

fn read_if_exists(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn today_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn date_days_ago(days: i64) -> String {
    (Local::now() - Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}
