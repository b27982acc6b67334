//! SQLite-backed indexed store for bulk entity volumes.
//!
//! One object table per instance. The connection is opened lazily on first
//! use and cached for the life of the store; all database work runs on the
//! blocking thread pool so callers never stall the async runtime.
//!
//! `get_all` is a full table scan filtered by key prefix — there is no
//! secondary index. This backend holds bulk volumes, not latency-critical
//! lookups, so the scan is acceptable.

use crate::adapter::{decode_entry, namespaced, strip_namespace, StorageAdapter};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct Inner {
    path: PathBuf,
    namespace: String,
    table: String,
    conn: Mutex<Option<Connection>>,
}

impl Inner {
    /// Runs `f` against the cached connection, opening it on first use.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self.conn.lock().unwrap();
        if guard.is_none() {
            let conn = Connection::open(&self.path)?;
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                self.table
            ))?;
            *guard = Some(conn);
        }
        f(guard.as_ref().expect("connection cached above"))
    }
}

/// Indexed store backed by a SQLite database file.
pub struct SqliteStore {
    inner: Arc<Inner>,
}

impl SqliteStore {
    /// Creates a store over the database at `path` with the default
    /// object table. The file is not touched until the first operation.
    pub fn new(path: impl AsRef<Path>, namespace: impl Into<String>) -> Self {
        Self::with_table(path, namespace, "entities")
    }

    /// Creates a store using a dedicated object table, letting several
    /// instances share one database file.
    pub fn with_table(
        path: impl AsRef<Path>,
        namespace: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.as_ref().to_path_buf(),
                namespace: namespace.into(),
                table: table.into(),
                conn: Mutex::new(None),
            }),
        }
    }

    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> StorageResult<T> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let key = key.to_string();
        self.run(move |inner| {
            let full = namespaced(&inner.namespace, &key);
            inner.with_conn(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT value FROM {} WHERE key = ?1", inner.table))?;
                let raw: Option<String> = stmt
                    .query_row(params![full], |row| row.get(0))
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(raw.and_then(|raw| decode_entry("sqlite", &key, &raw)))
            })
        })
        .await
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let key = key.to_string();
        let raw = serde_json::to_string(&value)?;
        self.run(move |inner| {
            let full = namespaced(&inner.namespace, &key);
            inner.with_conn(|conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (key, value) VALUES (?1, ?2) \
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                        inner.table
                    ),
                    params![full, raw],
                )?;
                Ok(())
            })
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.run(move |inner| {
            let full = namespaced(&inner.namespace, &key);
            inner.with_conn(|conn| {
                conn.execute(
                    &format!("DELETE FROM {} WHERE key = ?1", inner.table),
                    params![full],
                )?;
                Ok(())
            })
        })
        .await
    }

    async fn get_all(&self, prefix: &str) -> StorageResult<BTreeMap<String, Value>> {
        let prefix = prefix.to_string();
        self.run(move |inner| {
            inner.with_conn(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT key, value FROM {}", inner.table))?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut out = BTreeMap::new();
                for row in rows {
                    let (full, raw) = row?;
                    let Some(key) = strip_namespace(&inner.namespace, &full) else {
                        continue;
                    };
                    if !key.starts_with(&prefix) {
                        continue;
                    }
                    if let Some(value) = decode_entry("sqlite", key, &raw) {
                        out.insert(key.to_string(), value);
                    }
                }
                Ok(out)
            })
        })
        .await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.run(move |inner| {
            let ns = format!("{}:%", inner.namespace);
            inner.with_conn(|conn| {
                conn.execute(
                    &format!("DELETE FROM {} WHERE key LIKE ?1", inner.table),
                    params![ns],
                )?;
                Ok(())
            })
        })
        .await
    }
}
