//! Synchronous key-value file backend.
//!
//! The whole map is held in memory and rewritten to disk on every mutation,
//! which is fine for the small volumes this backend is meant for (the
//! offline queue, settings). Writes go through a temp file + rename so a
//! crash mid-write cannot corrupt the store.

use crate::adapter::{decode_entry, namespaced, strip_namespace, StorageAdapter};
use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Key-value store persisted as a single JSON object file.
///
/// Every operation completes synchronously; the async contract is kept for
/// uniformity with the other backends.
pub struct JsonFileStore {
    path: PathBuf,
    namespace: String,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// An unreadable or unparseable file starts the store empty with a
    /// warning rather than failing — the data will be rewritten on the
    /// next mutation.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!("kv file {} is unparseable, starting empty: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            namespace: namespace.into(),
            entries: Mutex::new(entries),
        })
    }

    /// Rewrites the backing file from the in-memory map.
    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let full = namespaced(&self.namespace, key);
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&full)
            .and_then(|raw| decode_entry("kv-file", key, raw)))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let full = namespaced(&self.namespace, key);
        let raw = serde_json::to_string(&value)?;
        let mut entries = self.entries.lock().unwrap();
        entries.insert(full, raw);
        self.persist(&entries)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let full = namespaced(&self.namespace, key);
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(&full).is_some() {
            self.persist(&entries)?;
        }
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
            if let Some(value) = decode_entry("kv-file", key, raw) {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    async fn clear(&self) -> StorageResult<()> {
        let ns = format!("{}:", self.namespace);
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|k, _| !k.starts_with(&ns));
        self.persist(&entries)
    }
}
