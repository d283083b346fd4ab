//! Key/value store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Maximum key length accepted by any store.
const MAX_KEY_LEN: usize = 128;

/// Errors from a key/value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key contains characters that are not allowed.
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// The underlying medium could not be read or written.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the write (e.g. a size quota).
    #[error("Storage quota exceeded for key '{key}' ({size} bytes)")]
    QuotaExceeded { key: String, size: usize },
}

/// Synchronous string key/value storage.
///
/// Implementations must be safe to share across tasks.
pub trait KvStore: Send + Sync {
    /// Read the value under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`.  Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Allowed key characters: alphanumeric, hyphen, underscore, dot.
/// Keys double as file names in [`FileStore`](crate::FileStore).
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Process-local store backed by a `HashMap`.
///
/// An optional byte quota mimics the size limit of browser storage.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects any single value larger than `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        if let Some(quota) = self.quota_bytes {
            if value.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                });
            }
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn safe_keys() {
        assert!(validate_key("workflow_history").is_ok());
        assert!(validate_key("workflow-app.config").is_ok());
    }

    #[test]
    fn unsafe_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key(&"k".repeat(200)).is_err());
    }

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing twice is fine.
        store.remove("k").unwrap();
    }

    #[test]
    fn memory_store_enforces_quota() {
        let store = MemoryStore::with_quota(4);
        store.set("k", "1234").unwrap();
        assert_matches!(
            store.set("k", "12345"),
            Err(StoreError::QuotaExceeded { size: 5, .. })
        );
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1234"));
    }
}
