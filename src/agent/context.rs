//! Context builder for agent conversations.
//!
//! Assembles the system prompt (identity, workspace, bootstrap
//! documents, memory) and the full message list handed to the
//! provider, including inline image attachments.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::memory::MemoryStore;
use crate::providers::ContentPart;
use crate::session::SessionMessage;

/// Workspace files injected into the system prompt when present,
/// rendered in this order.
const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md", "IDENTITY.md"];

/// Builds the system prompt and message history for provider calls.
pub struct ContextBuilder {
    workspace: PathBuf,
    memory: MemoryStore,
    skills_summary: Option<String>,
}

impl ContextBuilder {
    /// Create a context builder over the given workspace.
    pub fn new(workspace: PathBuf, memory: MemoryStore) -> Self {
        Self {
            workspace,
            memory,
            skills_summary: None,
        }
    }

    /// Attach a pre-rendered skills summary to the system prompt.
    pub fn with_skills_summary(mut self, summary: &str) -> Self {
        self.skills_summary = Some(summary.to_string());
        self
    }

    /// Build the system prompt from workspace state.
    pub fn build_system_prompt(&self) -> String {
        let mut prompt = String::from("# ferrobot\n\n");
        prompt.push_str("## Workspace\n");
        prompt.push_str(&format!(
            "Your workspace is at: {}\n\n",
            self.workspace.display()
        ));

        let bootstrap = self.load_bootstrap_files();
        if !bootstrap.is_empty() {
            prompt.push_str(&bootstrap);
            prompt.push_str("\n\n");
        }

        let memory = self.memory.context();
        if !memory.is_empty() {
            prompt.push_str(&format!("# Memory\n\n{}\n\n", memory));
        }

        if let Some(summary) = &self.skills_summary {
            if !summary.is_empty() {
                prompt.push_str(&format!("# Skills\n\n{}\n", summary));
            }
        }

        prompt
    }

    /// Build the complete message list for a provider call: system
    /// prompt, windowed history, then the current user message.
    ///
    /// Image attachments in `media` become inline base64 content parts
    /// on the user message; unknown or unreadable files are skipped.
    pub fn build_messages(
        &self,
        history: Vec<SessionMessage>,
        content: &str,
        media: &[String],
    ) -> Vec<SessionMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(SessionMessage::system(&self.build_system_prompt()));
        messages.extend(history);

        let parts = self.build_user_parts(content, media);
        if parts.is_empty() {
            messages.push(SessionMessage::user(content));
        } else {
            messages.push(SessionMessage::user_with_parts(content, parts));
        }
        messages
    }

    fn load_bootstrap_files(&self) -> String {
        let mut out = String::new();
        for filename in BOOTSTRAP_FILES {
            let path = self.workspace.join(filename);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    out.push_str(&format!("## {}\n\n{}\n\n", filename, content));
                }
                Err(_) => continue,
            }
        }
        out
    }

    /// Encode image attachments as data-URL content parts. The text
    /// part goes last so providers see attachments before the prompt.
    fn build_user_parts(&self, text: &str, media: &[String]) -> Vec<ContentPart> {
        if media.is_empty() {
            return Vec::new();
        }

        let mut parts = Vec::new();
        for path_str in media {
            let path = Path::new(path_str);
            let Some(mime) = mime_for(path) else {
                warn!(path = %path_str, "Skipping attachment with unsupported extension");
                continue;
            };
            let bytes = match std::fs::read(path) {
                Ok(b) if !b.is_empty() => b,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path_str, error = %e, "Skipping unreadable attachment");
                    continue;
                }
            };
            debug!(path = %path_str, mime = mime, size = bytes.len(), "Inlining attachment");
            let url = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
            parts.push(ContentPart::image_url(&url));
        }

        parts.push(ContentPart::text(text));
        parts
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Some("image/png"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("bmp") => Some("image/bmp"),
        _ => None,
    }
}
