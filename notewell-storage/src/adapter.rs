//! The storage adapter contract and the in-memory backend.

use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::warn;

/// Uniform contract over a local persistence backend.
///
/// Keys passed in are logical keys; every implementation prepends its
/// configured namespace before touching the backend, and `clear` removes
/// only keys under that namespace.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Reads one value, `None` if absent. A value that cannot be decoded
    /// is treated as absent (logged as a warning).
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Writes one value. Failures propagate to the caller.
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Deletes one key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns every entry whose logical key starts with `prefix`.
    /// Undecodable entries are skipped, never aborting the scan.
    async fn get_all(&self, prefix: &str) -> StorageResult<BTreeMap<String, Value>>;

    /// Removes every key under this adapter's namespace.
    async fn clear(&self) -> StorageResult<()>;
}

/// Joins a namespace and a logical key into a backend key.
pub(crate) fn namespaced(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Strips the namespace from a backend key, `None` if it belongs elsewhere.
pub(crate) fn strip_namespace<'a>(namespace: &str, full_key: &'a str) -> Option<&'a str> {
    full_key
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix(':'))
}

/// Decodes a stored JSON text, warn-and-skip on failure.
pub(crate) fn decode_entry(backend: &str, key: &str, raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("skipping malformed {backend} entry for key {key}: {e}");
            None
        }
    }
}

/// HashMap-backed adapter for tests and ephemeral sessions.
pub struct MemoryStore {
    namespace: String,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Plants a raw (possibly malformed) value, used by tests exercising
    /// the skip-bad-entries path.
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) {
        let full = namespaced(&self.namespace, key);
        self.entries.lock().unwrap().insert(full, raw.into());
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let full = namespaced(&self.namespace, key);
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&full)
            .and_then(|raw| decode_entry("memory", key, raw)))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let full = namespaced(&self.namespace, key);
        let raw = serde_json::to_string(&value)?;
        self.entries.lock().unwrap().insert(full, raw);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let full = namespaced(&self.namespace, key);
        self.entries.lock().unwrap().remove(&full);
        Ok(())
    }

    async fn get_all(&self, prefix: &str) -> StorageResult<BTreeMap<String, Value>> {
        let entries = self.entries.lock().unwrap();
        let mut out = BTreeMap::new();
        for (full, raw) in entries.iter() {
            let Some(key) = strip_namespace(&self.namespace, full) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(value) = decode_entry("memory", key, raw) {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    async fn clear(&self) -> StorageResult<()> {
        let ns = format!("{}:", self.namespace);
        self.entries.lock().unwrap().retain(|k, _| !k.starts_with(&ns));
        Ok(())
    }
}
