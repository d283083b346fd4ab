//! Fail-soft JSON persistence helpers.
//!
//! Persistence problems (unavailable storage, quota, corrupt documents)
//! are never surfaced to callers: they are logged here and degrade to an
//! absent value or a skipped write.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kv::KvStore;

/// Load and deserialize the JSON document under `key`.
///
/// Returns `None` when the key is absent, unreadable, or holds a
/// document that does not parse as `T`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!(key, error = %e, "Failed to read from storage");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unparseable stored document");
            None
        }
    }
}

/// Serialize `value` and store it under `key`.
///
/// Returns whether the write succeeded.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> bool {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(key, error = %e, "Failed to serialize document for storage");
            return false;
        }
    };

    match store.set(key, &json) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(key, error = %e, "Failed to write to storage");
            false
        }
    }
}

/// Delete `key`, logging instead of failing.
pub fn remove_key(store: &dyn KvStore, key: &str) -> bool {
    match store.remove(key) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(key, error = %e, "Failed to remove from storage");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn round_trip() {
        let store = MemoryStore::new();
        let value = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        assert!(save_json(&store, "doc", &value));
        let loaded: BTreeMap<String, i32> = load_json(&store, "doc").unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn absent_key_loads_none() {
        let store = MemoryStore::new();
        assert!(load_json::<Vec<String>>(&store, "doc").is_none());
    }

    #[test]
    fn corrupt_document_loads_none() {
        let store = MemoryStore::new();
        store.set("doc", "{not json").unwrap();
        assert!(load_json::<Vec<String>>(&store, "doc").is_none());
    }

    #[test]
    fn wrong_shape_loads_none() {
        let store = MemoryStore::new();
        store.set("doc", r#"{"an":"object"}"#).unwrap();
        assert!(load_json::<Vec<String>>(&store, "doc").is_none());
    }

    #[test]
    fn failed_write_reports_false() {
        let store = MemoryStore::with_quota(2);
        assert!(!save_json(&store, "doc", &vec!["too large"]));
        assert!(load_json::<Vec<String>>(&store, "doc").is_none());
    }

    #[test]
    fn invalid_key_is_soft_failure() {
        let store = MemoryStore::new();
        assert!(!save_json(&store, "bad key", &1));
        assert!(load_json::<i32>(&store, "bad key").is_none());
        assert!(!remove_key(&store, "bad key"));
    }
}
