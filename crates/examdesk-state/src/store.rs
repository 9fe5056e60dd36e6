//! Key/value persistence for client-side state.
//!
//! Everything the client keeps across restarts (session token, cached
//! profile, unlocked courses, exam attempts) goes through a
//! [`KeyValueStore`]. Writes are synchronous and write-through; there are no
//! transactions, so readers must cope with a key being present while a
//! related one is missing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StateError};

/// Default state file name within the data directory.
pub const STATE_FILE: &str = "state.json";

/// Persisted key names.
pub mod keys {
    /// Prefix shared by every session key. Logout clears exactly this.
    pub const SESSION_PREFIX: &str = "session.";
    /// Bearer token.
    pub const SESSION_TOKEN: &str = "session.token";
    /// Last fetched profile, as JSON.
    pub const SESSION_USER: &str = "session.user";

    /// Prefix shared by exam-progress keys.
    pub const PROGRESS_PREFIX: &str = "progress.";
    /// Unlocked course IDs, as a JSON array.
    pub const UNLOCKED_COURSES: &str = "progress.unlocked_courses";
    /// Exam attempts, as a JSON array.
    pub const TEST_ATTEMPTS: &str = "progress.test_attempts";
}

// ============================================================================
// KeyValueStore Trait
// ============================================================================

/// Trait for string key/value storage.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List all keys.
    fn keys(&self) -> Result<Vec<String>>;

    /// Delete every key starting with `prefix`, returning how many went.
    fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let doomed: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        for key in &doomed {
            self.remove(key)?;
        }
        Ok(doomed.len())
    }
}

/// Shared store for use across async contexts.
pub type SharedStore = Arc<dyn KeyValueStore>;

// ============================================================================
// FileStore
// ============================================================================

/// File-backed store: one JSON object holding every key.
///
/// The whole file is rewritten on each mutation through a temp file and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store in `data_dir`, creating nothing until the first write.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::with_path(data_dir.join(STATE_FILE))
    }

    /// Open a store at an explicit file path.
    ///
    /// An unreadable or corrupt file is logged and treated as empty.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                StateError::Storage(format!("Failed to read {}: {}", path.display(), e))
            })?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "State file is corrupt, starting empty"
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Get the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StateError::Storage(format!("Failed to create state directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| StateError::Storage(format!("Failed to write state file: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StateError::Storage(format!("Failed to replace state file: {}", e)))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(old) = entries.remove(key)
            && let Err(e) = self.flush(&entries)
        {
            entries.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.lock();
        let before = entries.clone();
        entries.retain(|k, _| !k.starts_with(prefix));
        let removed = before.len() - entries.len();
        if removed > 0
            && let Err(e) = self.flush(&entries)
        {
            *entries = before;
            return Err(e);
        }
        Ok(removed)
    }
}

// ============================================================================
// MemoryStore (for testing and ephemeral use)
// ============================================================================

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// Create a shared file-backed store in `data_dir`.
pub fn create_file_store(data_dir: &Path) -> Result<SharedStore> {
    Ok(Arc::new(FileStore::open(data_dir)?))
}

/// Create a shared in-memory store.
pub fn create_memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

// ============================================================================
// Typed helpers
// ============================================================================

/// Read and decode a JSON value.
///
/// A value that fails to decode is deleted and reported as absent, so one
/// corrupt entry never blocks startup. Read failures are also reported as
/// absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read persisted value");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding corrupt persisted value");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove corrupt persisted value");
            }
            None
        }
    }
}

/// Encode and write a JSON value.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_remove_prefix_only_touches_namespace() {
        let store = MemoryStore::new();
        store.set(keys::SESSION_TOKEN, "tok").unwrap();
        store.set(keys::SESSION_USER, "{}").unwrap();
        store.set(keys::UNLOCKED_COURSES, "[]").unwrap();

        assert_eq!(store.remove_prefix(keys::SESSION_PREFIX).unwrap(), 2);
        assert_eq!(store.keys().unwrap(), vec![keys::UNLOCKED_COURSES.to_string()]);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let temp = tempdir().unwrap();
        {
            let store = FileStore::open(temp.path()).unwrap();
            store.set(keys::SESSION_TOKEN, "tok").unwrap();
            store.set(keys::TEST_ATTEMPTS, "[]").unwrap();
            store.remove(keys::TEST_ATTEMPTS).unwrap();
        }

        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(store.get(keys::SESSION_TOKEN).unwrap().as_deref(), Some("tok"));
        assert_eq!(store.get(keys::TEST_ATTEMPTS).unwrap(), None);
        assert!(store.path().ends_with(STATE_FILE));
    }

    #[test]
    fn test_file_store_remove_prefix_persists() {
        let temp = tempdir().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.set(keys::SESSION_TOKEN, "tok").unwrap();
        store.set(keys::UNLOCKED_COURSES, r#"["c1"]"#).unwrap();

        assert_eq!(store.remove_prefix(keys::SESSION_PREFIX).unwrap(), 1);

        let reopened = FileStore::open(temp.path()).unwrap();
        assert_eq!(reopened.get(keys::SESSION_TOKEN).unwrap(), None);
        assert!(reopened.get(keys::UNLOCKED_COURSES).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(STATE_FILE), "{not json").unwrap();

        let store = FileStore::open(temp.path()).unwrap();
        assert!(store.keys().unwrap().is_empty());

        // And the next write repairs it
        store.set("k", "v").unwrap();
        let reopened = FileStore::open(temp.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_load_json_discards_corrupt_value() {
        let store = MemoryStore::new();
        store.set(keys::UNLOCKED_COURSES, "[\"c1\",").unwrap();

        let loaded: Option<Vec<String>> = load_json(&store, keys::UNLOCKED_COURSES);
        assert!(loaded.is_none());
        assert_eq!(store.get(keys::UNLOCKED_COURSES).unwrap(), None);
    }

    #[test]
    fn test_save_and_load_json() {
        let store = create_memory_store();
        save_json(store.as_ref(), keys::UNLOCKED_COURSES, &["c1", "c2"]).unwrap();

        let loaded: Vec<String> = load_json(store.as_ref(), keys::UNLOCKED_COURSES).unwrap();
        assert_eq!(loaded, vec!["c1", "c2"]);
    }
}
