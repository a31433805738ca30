//! Persisted key-value state for the client.
//!
//! The store holds small JSON documents under well-known keys: the auth
//! session, the cached permission set, and one chat history per assistant.
//! [`JsonLocalStore`] keeps everything in a single JSON file (tilde expansion,
//! config directory fallback); [`InMemoryLocalStore`] backs tests and sessions
//! that should not touch disk.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dirs_next::config_dir;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::expand_tilde;

/// Environment variable controlling the state file location.
pub const STATE_PATH_ENV: &str = "FLOWDESK_STATE_PATH";

/// Default filename for the persisted state.
pub const STATE_FILE_NAME: &str = "state.json";

/// Session tokens and current user.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";
/// Cached permission set of the current user.
pub const PERMISSIONS_STORAGE_KEY: &str = "permissions-storage";
/// Template assistant chat history.
pub const CHAT_STORAGE_KEY: &str = "ai-chat-storage";
/// Resource assistant chat history.
pub const RESOURCE_CHAT_STORAGE_KEY: &str = "resource-ai-chat-storage";

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure while reading or writing the state file.
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared trait implemented by state persistence backends.
pub trait LocalStore: Send + Sync {
    /// Raw JSON document stored under `key`.
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the document stored under `key`.
    fn set_value(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Typed access on top of [`LocalStore`].
pub trait LocalStoreExt: LocalStore {
    /// Loads and decodes the document under `key`.
    ///
    /// A document that no longer matches `T` is treated as absent so that a
    /// schema change never locks the user out.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.get_value(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(error) => {
                warn!(key, error = %error, "discarding unreadable stored state");
                Ok(None)
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.set_value(key, serde_json::to_value(value)?)
    }
}

impl<S: LocalStore + ?Sized> LocalStoreExt for S {}

type StateFile = IndexMap<String, Value>;

/// JSON-backed store persisted on disk.
pub struct JsonLocalStore {
    path: PathBuf,
    entries: Mutex<StateFile>,
}

impl JsonLocalStore {
    /// Open the store at the provided path (or the default path when omitted).
    pub fn new<P: Into<Option<PathBuf>>>(path: P) -> Result<Self, StoreError> {
        let resolved_path = match path.into() {
            Some(path) => expand_tilde(&path.to_string_lossy()),
            None => default_state_path(),
        };
        let entries = load_state_file(&resolved_path)?;
        debug!(path = %resolved_path.display(), keys = entries.len(), "opened local state");
        Ok(Self {
            path: resolved_path,
            entries: Mutex::new(entries),
        })
    }

    /// Open the store at the default location.
    pub fn with_defaults() -> Result<Self, StoreError> {
        Self::new(None::<PathBuf>)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_locked(&self, entries: &StateFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl LocalStore for JsonLocalStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().expect("state lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("state lock poisoned");
        entries.insert(key.to_string(), value);
        self.save_locked(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("state lock poisoned");
        if entries.shift_remove(key).is_some() {
            self.save_locked(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryLocalStore {
    entries: Mutex<StateFile>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for InMemoryLocalStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().expect("state lock poisoned").get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().expect("state lock poisoned").insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().expect("state lock poisoned").shift_remove(key);
        Ok(())
    }
}

/// Resolves the state file path from `FLOWDESK_STATE_PATH` or the config directory.
pub fn default_state_path() -> PathBuf {
    if let Ok(path) = env::var(STATE_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowdesk")
        .join(STATE_FILE_NAME)
}

fn load_state_file(path: &Path) -> Result<StateFile, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<StateFile>(&content) {
            Ok(file) => Ok(file),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to parse state file; starting empty");
                Ok(StateFile::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(StateFile::default()),
        Err(error) => Err(StoreError::Io(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        token: String,
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");
        let store = JsonLocalStore::new(Some(path.clone())).expect("open store");
        store.save(AUTH_STORAGE_KEY, &Session { token: "t1".into() }).expect("save");
        drop(store);

        let reopened = JsonLocalStore::new(Some(path)).expect("reopen store");
        let session: Option<Session> = reopened.load(AUTH_STORAGE_KEY).expect("load");
        assert_eq!(session, Some(Session { token: "t1".into() }));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").expect("write");
        let store = JsonLocalStore::new(Some(path)).expect("open store");
        assert!(store.get_value(AUTH_STORAGE_KEY).expect("get").is_none());
    }

    #[test]
    fn mismatched_document_loads_as_absent() {
        let store = InMemoryLocalStore::new();
        store.set_value(AUTH_STORAGE_KEY, json!({ "unexpected": true })).expect("set");
        let session: Option<Session> = store.load(AUTH_STORAGE_KEY).expect("load");
        assert!(session.is_none());
    }

    #[test]
    fn remove_deletes_only_the_requested_key() {
        let store = InMemoryLocalStore::new();
        store.set_value(CHAT_STORAGE_KEY, json!([])).expect("set chat");
        store.set_value(RESOURCE_CHAT_STORAGE_KEY, json!([1])).expect("set resource chat");
        store.remove(CHAT_STORAGE_KEY).expect("remove");
        assert!(store.get_value(CHAT_STORAGE_KEY).expect("get").is_none());
        assert_eq!(store.get_value(RESOURCE_CHAT_STORAGE_KEY).expect("get"), Some(json!([1])));
    }

    #[test]
    fn state_path_honours_env_override() {
        temp_env::with_var(STATE_PATH_ENV, Some("/tmp/flowdesk-test/state.json"), || {
            assert_eq!(default_state_path(), PathBuf::from("/tmp/flowdesk-test/state.json"));
        });
        temp_env::with_var(STATE_PATH_ENV, Some("   "), || {
            assert!(default_state_path().ends_with(Path::new("flowdesk").join(STATE_FILE_NAME)));
        });
    }
}
