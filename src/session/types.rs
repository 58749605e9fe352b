//! Session types for Ferrobot
//!
//! This module defines the core types for conversation state: sessions,
//! their message log, roles, and the history-windowing rule the agent
//! engine applies when assembling model input.

use crate::providers::{ContentPart, ToolCallRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw-entry cap applied before the tool-visibility cutoff in
/// [`Session::history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// How many most-recent user turns keep their tool call/result entries
/// visible in assembled history.
const RECENT_USER_TURNS: usize = 3;

/// A conversation session: an ordered, append-only message log plus metadata.
///
/// Sessions are keyed by `channel:chat_id`, exclusively owned by the agent
/// engine during a turn, and persisted through the session store after each
/// turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session (e.g., "telegram:chat123")
    pub key: String,
    /// Ordered list of messages in this conversation
    pub messages: Vec<SessionMessage>,
    /// When this session was created
    pub created_at: DateTime<Utc>,
    /// When this session was last modified
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session with the given key.
    ///
    /// # Example
    /// ```
    /// use ferrobot::session::Session;
    ///
    /// let session = Session::new("telegram:chat123");
    /// assert!(session.messages.is_empty());
    /// ```
    pub fn new(key: &str) -> Self {
        let now = Utc::now();
        Self {
            key: key.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to this session and refresh `updated_at`.
    pub fn add_message(&mut self, message: SessionMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Append a tool-result message referencing a prior tool call.
    pub fn add_tool_message(&mut self, tool_call_id: &str, name: &str, content: &str) {
        self.add_message(SessionMessage::tool_result(tool_call_id, name, content));
    }

    /// Get the number of messages in this session.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check if this session is empty (no messages).
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the last message in this session, if any.
    pub fn last_message(&self) -> Option<&SessionMessage> {
        self.messages.last()
    }

    /// Bounded recent history for model input.
    ///
    /// Caps to the last `max_entries` raw entries, then finds the
    /// 3rd-most-recent `user` message scanning backward. Tool-role entries
    /// older than that cutoff are dropped and `tool_calls` on assistant
    /// entries older than the cutoff are cleared: tool call/result pairs are
    /// expensive context and only stay visible while their originating user
    /// turn is still recent. User/assistant text is always kept.
    pub fn history(&self, max_entries: usize) -> Vec<SessionMessage> {
        let start = self.messages.len().saturating_sub(max_entries);
        let window = &self.messages[start..];

        let mut cutoff = 0;
        let mut seen_users = 0;
        for (i, msg) in window.iter().enumerate().rev() {
            if msg.role == Role::User {
                seen_users += 1;
                if seen_users == RECENT_USER_TURNS {
                    cutoff = i;
                    break;
                }
            }
        }

        window
            .iter()
            .enumerate()
            .filter_map(|(i, msg)| {
                if i >= cutoff {
                    return Some(msg.clone());
                }
                if msg.role == Role::Tool {
                    return None;
                }
                let mut trimmed = msg.clone();
                trimmed.tool_calls = None;
                Some(trimmed)
            })
            .collect()
    }
}

/// A single message in a conversation log.
///
/// Messages come from users, the assistant, system prompts, or tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Name of the tool that produced this result (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ID of the tool call this message is responding to (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls requested by the assistant (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Inline multi-part content for provider-bound messages carrying media.
    /// Never persisted; set only by the context builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<ContentPart>>,
}

impl SessionMessage {
    fn base(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
            parts: None,
        }
    }

    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use ferrobot::session::{Role, SessionMessage};
    ///
    /// let msg = SessionMessage::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self::base(Role::User, content)
    }

    /// Create a user message carrying inline media parts for model input.
    pub fn user_with_parts(content: &str, parts: Vec<ContentPart>) -> Self {
        let mut msg = Self::base(Role::User, content);
        msg.parts = Some(parts);
        msg
    }

    /// Create a new assistant message.
    pub fn assistant(content: &str) -> Self {
        Self::base(Role::Assistant, content)
    }

    /// Create a new system message (prompts and instructions).
    pub fn system(content: &str) -> Self {
        Self::base(Role::System, content)
    }

    /// Create a tool-result message referencing a prior tool call.
    ///
    /// The `tool_call_id` is a foreign-key-style reference to a `tool_calls`
    /// entry on a preceding assistant message; the engine guarantees the
    /// pairing by construction.
    ///
    /// # Example
    /// ```
    /// use ferrobot::session::{Role, SessionMessage};
    ///
    /// let msg = SessionMessage::tool_result("call_123", "shell", "done");
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    /// ```
    pub fn tool_result(tool_call_id: &str, name: &str, content: &str) -> Self {
        let mut msg = Self::base(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.to_string());
        msg.name = Some(name.to_string());
        msg
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCallRequest>) -> Self {
        let mut msg = Self::base(Role::Assistant, content);
        msg.tool_calls = Some(tool_calls);
        msg
    }

    /// Check if this message has tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }

    /// Check if this is a tool result message.
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool && self.tool_call_id.is_some()
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the user
    User,
    /// Messages from the AI assistant
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, name, HashMap::new())
    }

    #[test]
    fn test_session_new() {
        let session = Session::new("test-session");
        assert_eq!(session.key, "test-session");
        assert!(session.messages.is_empty());
        assert!(session.created_at <= session.updated_at);
    }

    #[test]
    fn test_session_add_message() {
        let mut session = Session::new("test");
        let initial_updated = session.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));

        session.add_message(SessionMessage::user("Hello"));
        assert_eq!(session.messages.len(), 1);
        assert!(session.updated_at >= initial_updated);
    }

    #[test]
    fn test_session_helpers() {
        let mut session = Session::new("test");
        assert!(session.is_empty());
        assert_eq!(session.message_count(), 0);
        assert!(session.last_message().is_none());

        session.add_message(SessionMessage::user("Hello"));
        session.add_message(SessionMessage::assistant("Hi!"));

        assert!(!session.is_empty());
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.last_message().unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_message_constructors() {
        let msg = SessionMessage::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_call_id.is_none());

        let msg = SessionMessage::system("You are helpful");
        assert_eq!(msg.role, Role::System);

        let msg = SessionMessage::tool_result("call_123", "shell", "Success");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.name.as_deref(), Some("shell"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
        assert!(msg.is_tool_result());

        let msg = SessionMessage::assistant_with_tools("Searching...", vec![call("c1", "search")]);
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls.as_ref().unwrap()[0].name, "search");
    }

    #[test]
    fn test_role_serialize() {
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, r#""user""#);
        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn test_message_serialization_skips_none() {
        let msg = SessionMessage::user("Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
        assert!(!json.contains("parts"));
    }

    #[test]
    fn test_session_serialization_round_trip() {
        let mut session = Session::new("test-session");
        session.add_message(SessionMessage::user("Hello"));
        session.add_message(SessionMessage::assistant_with_tools(
            "",
            vec![call("c1", "echo")],
        ));
        session.add_tool_message("c1", "echo", "echoed");

        let json = serde_json::to_string(&session).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.key, "test-session");
        assert_eq!(parsed.messages.len(), 3);
        assert_eq!(parsed.messages[0].role, Role::User);
        assert!(parsed.messages[1].has_tool_calls());
        assert_eq!(parsed.messages[2].tool_call_id.as_deref(), Some("c1"));
    }

    /// Build a session with `turns` user turns, each followed by
    /// `pairs` tool-call/tool-result pairs and a closing assistant answer.
    fn session_with_tool_turns(turns: usize, pairs: usize) -> Session {
        let mut session = Session::new("test");
        for t in 0..turns {
            session.add_message(SessionMessage::user(&format!("question {}", t)));
            for p in 0..pairs {
                let id = format!("call_{}_{}", t, p);
                session.add_message(SessionMessage::assistant_with_tools(
                    "",
                    vec![call(&id, "shell")],
                ));
                session.add_tool_message(&id, "shell", "output");
            }
            session.add_message(SessionMessage::assistant(&format!("answer {}", t)));
        }
        session
    }

    #[test]
    fn test_history_keeps_recent_tool_entries() {
        let session = session_with_tool_turns(5, 2);
        let history = session.history(DEFAULT_HISTORY_LIMIT);

        // Tool results for the last 3 user turns survive (2 per turn).
        let tool_count = history.iter().filter(|m| m.role == Role::Tool).count();
        assert_eq!(tool_count, 6);

        // Assistants attached to the 2 oldest user turns lost their tool_calls.
        let stripped: Vec<&SessionMessage> = history
            .iter()
            .filter(|m| m.role == Role::Assistant && m.has_tool_calls())
            .collect();
        assert_eq!(stripped.len(), 6);
        for m in stripped {
            let id = &m.tool_calls.as_ref().unwrap()[0].id;
            assert!(!id.starts_with("call_0_") && !id.starts_with("call_1_"));
        }

        // User/assistant text from every turn is still there.
        let users = history.iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, 5);
    }

    #[test]
    fn test_history_caps_raw_entries() {
        let session = session_with_tool_turns(5, 2);
        // Each turn is 6 entries; a cap of 6 keeps only the final turn.
        let history = session.history(6);
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].content, "question 4");
    }

    #[test]
    fn test_history_short_session_untouched() {
        let session = session_with_tool_turns(2, 1);
        let history = session.history(DEFAULT_HISTORY_LIMIT);
        // Fewer than 3 user turns: nothing is old enough to trim.
        assert_eq!(history.len(), session.messages.len());
        assert!(history.iter().any(|m| m.role == Role::Tool));
    }
}
