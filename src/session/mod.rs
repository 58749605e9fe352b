//! Session module - conversation state management
//!
//! Sessions pair a key (usually `channel:chat_id`) with an ordered message
//! transcript. The manager layers an in-memory cache over JSON files so a
//! restart resumes every conversation where it left off.
//!
//! # Example
//!
//! ```
//! use ferrobot::session::{SessionManager, SessionMessage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = SessionManager::new_memory();
//!
//!     let mut session = manager.get_or_create("telegram:chat123").await.unwrap();
//!     session.add_message(SessionMessage::user("Hello!"));
//!     session.add_message(SessionMessage::assistant("Hi there!"));
//!
//!     manager.save(&session).await.unwrap();
//! }
//! ```

pub mod types;

pub use types::{Role, Session, SessionMessage, DEFAULT_HISTORY_LIMIT};

use crate::config::Config;
use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Characters that are percent-encoded in session file names.
///
/// Covers path separators plus everything Windows rejects, and `%` itself so
/// the encoding stays reversible.
const FILENAME_RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '%'];

/// Session manager: an in-memory cache over JSON file persistence.
///
/// Sessions are identified by unique keys (e.g., "telegram:chat123").
/// The manager uses `Arc<RwLock>` internally, making it safe to clone and
/// share across async tasks; the agent engine additionally serializes all
/// turn-time access behind its own critical section.
#[derive(Clone)]
pub struct SessionManager {
    cache: Arc<RwLock<HashMap<String, Session>>>,
    /// `None` means pure in-memory mode (tests, ephemeral runs).
    storage_path: Option<PathBuf>,
}

impl SessionManager {
    /// Create a manager persisting to `~/.ferrobot/sessions/`.
    ///
    /// # Errors
    /// Returns an error if the sessions directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_path(Config::dir().join("sessions"))
    }

    /// Create an in-memory session manager without persistence.
    pub fn new_memory() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Create a session manager persisting under `path`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(path),
        })
    }

    /// Get an existing session or create a new empty one under `key`.
    ///
    /// Resolution order: cache, then disk (loading warms the cache), then a
    /// fresh `Session::new`.
    ///
    /// # Errors
    /// Returns an error if loading from disk fails.
    pub async fn get_or_create(&self, key: &str) -> Result<Session> {
        if let Some(session) = self.get(key).await? {
            return Ok(session);
        }

        let session = Session::new(key);
        self.cache
            .write()
            .await
            .insert(key.to_string(), session.clone());
        Ok(session)
    }

    /// Get a session by key without creating it.
    ///
    /// # Errors
    /// Returns an error if loading from disk fails.
    pub async fn get(&self, key: &str) -> Result<Option<Session>> {
        if let Some(session) = self.cache.read().await.get(key) {
            return Ok(Some(session.clone()));
        }

        match self.load_from_disk(key).await? {
            Some(session) => {
                self.cache
                    .write()
                    .await
                    .insert(key.to_string(), session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Save a session to the cache and, when persistence is enabled, to disk.
    ///
    /// # Errors
    /// Returns an error if writing to disk fails.
    pub async fn save(&self, session: &Session) -> Result<()> {
        self.cache
            .write()
            .await
            .insert(session.key.clone(), session.clone());

        if let Some(path) = self.file_for(&session.key) {
            let content = serde_json::to_string_pretty(session)?;
            tokio::fs::write(&path, content).await?;
        }

        Ok(())
    }

    /// Delete a session from both cache and disk.
    ///
    /// Returns `true` if a session was actually removed from either place.
    ///
    /// # Errors
    /// Returns an error if deleting from disk fails.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut existed = self.cache.write().await.remove(key).is_some();

        if let Some(path) = self.file_for(key) {
            if path.exists() {
                tokio::fs::remove_file(&path).await?;
                existed = true;
            }
        }

        Ok(existed)
    }

    /// List all session keys, merged from cache and disk, sorted.
    ///
    /// # Errors
    /// Returns an error if reading the storage directory fails.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.cache.read().await.keys().cloned().collect();

        // Stored files carry the original key inside the JSON, so read them
        // instead of trying to decode filenames.
        if let Some(ref storage_path) = self.storage_path {
            let mut entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json") != Some(true) {
                    continue;
                }
                let Ok(content) = tokio::fs::read_to_string(&path).await else {
                    continue;
                };
                if let Ok(session) = serde_json::from_str::<Session>(&content) {
                    if !keys.contains(&session.key) {
                        keys.push(session.key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Check if a session exists in the cache or on disk.
    pub async fn exists(&self, key: &str) -> bool {
        if self.cache.read().await.contains_key(key) {
            return true;
        }
        self.file_for(key).is_some_and(|p| p.exists())
    }

    /// Drop all cached sessions (disk is untouched).
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    async fn load_from_disk(&self, key: &str) -> Result<Option<Session>> {
        let Some(path) = self.file_for(key) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Backing file for `key`, or `None` in memory-only mode.
    fn file_for(&self, key: &str) -> Option<PathBuf> {
        self.storage_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", Self::encode_key(key))))
    }

    /// Percent-encode reserved characters so distinct keys can never land on
    /// the same filename.
    fn encode_key(key: &str) -> String {
        let mut out = String::with_capacity(key.len());
        for c in key.chars() {
            if FILENAME_RESERVED.contains(&c) {
                out.push_str(&format!("%{:02X}", c as u32));
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl Default for SessionManager {
    /// Creates an in-memory session manager.
    ///
    /// Use `SessionManager::new()` for file-based persistence.
    fn default() -> Self {
        Self::new_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ToolCallRequest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_or_create_starts_empty() {
        let manager = SessionManager::new_memory();
        let session = manager.get_or_create("cli:local").await.unwrap();
        assert_eq!(session.key, "cli:local");
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_reload_from_cache() {
        let manager = SessionManager::new_memory();
        let mut session = manager.get_or_create("cli:local").await.unwrap();
        session.add_message(SessionMessage::user("Hello"));
        manager.save(&session).await.unwrap();

        let loaded = manager.get_or_create("cli:local").await.unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_get_without_create() {
        let manager = SessionManager::new_memory();
        assert!(manager.get("never-seen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let manager = SessionManager::new_memory();
        manager.get_or_create("cli:local").await.unwrap();
        assert!(manager.exists("cli:local").await);

        assert!(manager.delete("cli:local").await.unwrap());
        assert!(!manager.exists("cli:local").await);
        // Second delete finds nothing.
        assert!(!manager.delete("cli:local").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_the_cache() {
        let manager = SessionManager::new_memory();
        let other = manager.clone();

        let mut session = manager.get_or_create("shared").await.unwrap();
        session.add_message(SessionMessage::user("Test"));
        manager.save(&session).await.unwrap();

        let loaded = other.get("shared").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip_is_field_identical() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().to_path_buf();

        {
            let manager = SessionManager::with_path(storage_path.clone()).unwrap();
            let mut session = manager.get_or_create("persist-test").await.unwrap();
            session.add_message(SessionMessage::user("Search for rust"));
            session.add_message(SessionMessage::assistant_with_tools(
                "Let me search.",
                vec![ToolCallRequest::new(
                    "call_1",
                    "search",
                    [("q".to_string(), "rust".to_string())].into(),
                )],
            ));
            session.add_tool_message("call_1", "search", "Found 100 results");
            session.add_message(SessionMessage::assistant("I found 100 results."));
            manager.save(&session).await.unwrap();
        }

        // A fresh manager over the same directory sees every field intact.
        {
            let manager = SessionManager::with_path(storage_path).unwrap();
            let session = manager.get_or_create("persist-test").await.unwrap();
            assert_eq!(session.messages.len(), 4);
            assert_eq!(session.messages[0].role, Role::User);
            assert!(session.messages[1].has_tool_calls());
            assert_eq!(
                session.messages[1].tool_calls.as_ref().unwrap()[0]
                    .arguments
                    .get("q")
                    .map(String::as_str),
                Some("rust")
            );
            assert_eq!(session.messages[2].tool_call_id.as_deref(), Some("call_1"));
            assert_eq!(session.messages[2].name.as_deref(), Some("search"));
            assert_eq!(session.messages[3].content, "I found 100 results.");
        }
    }

    #[tokio::test]
    async fn test_delete_removes_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().to_path_buf();
        let manager = SessionManager::with_path(storage_path.clone()).unwrap();

        let session = manager.get_or_create("delete-test").await.unwrap();
        manager.save(&session).await.unwrap();

        let file_path = storage_path.join("delete-test.json");
        assert!(file_path.exists());

        assert!(manager.delete("delete-test").await.unwrap());
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn test_list_merges_disk_and_survives_cold_cache() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::with_path(temp_dir.path().to_path_buf()).unwrap();

        for name in ["alpha", "beta", "gamma"] {
            let session = manager.get_or_create(name).await.unwrap();
            manager.save(&session).await.unwrap();
        }
        manager.clear_cache().await;

        let keys = manager.list().await.unwrap();
        assert_eq!(keys, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_list_returns_original_keys_with_special_chars() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::with_path(temp_dir.path().to_path_buf()).unwrap();

        let keys = ["telegram:chat123", "discord/server456", "slack:channel:789"];
        for key in &keys {
            let session = manager.get_or_create(key).await.unwrap();
            manager.save(&session).await.unwrap();
        }
        manager.clear_cache().await;

        let listed = manager.list().await.unwrap();
        assert_eq!(listed.len(), 3);
        for key in &keys {
            assert!(listed.contains(&key.to_string()));
        }
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(SessionManager::encode_key("simple"), "simple");
        assert_eq!(
            SessionManager::encode_key("telegram:chat123"),
            "telegram%3Achat123"
        );
        assert_eq!(
            SessionManager::encode_key("path/to/session"),
            "path%2Fto%2Fsession"
        );
        assert_eq!(SessionManager::encode_key("100%done"), "100%25done");
    }

    #[test]
    fn test_encode_key_never_collides() {
        let inputs = ["a:b", "a/b", "a%3Ab", "a_b", "a\\b"];
        let encoded: Vec<String> = inputs.iter().map(|k| SessionManager::encode_key(k)).collect();
        for i in 0..encoded.len() {
            for j in (i + 1)..encoded.len() {
                assert_ne!(encoded[i], encoded[j], "{} vs {}", inputs[i], inputs[j]);
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_save_keeps_session_usable() {
        let manager = Arc::new(SessionManager::new_memory());
        let mut handles = Vec::new();

        for i in 0..10 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                let mut session = manager.get_or_create("concurrent").await.unwrap();
                session.add_message(SessionMessage::user(&format!("Message {}", i)));
                manager.save(&session).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = manager.get("concurrent").await.unwrap().unwrap();
        assert!(!session.messages.is_empty());
    }
}
