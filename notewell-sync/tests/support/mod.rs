//! Shared test helpers: an in-memory remote store with call counting and
//! scriptable failures, payload builders, and a write-rejecting adapter.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use notewell_storage::{StorageAdapter, StorageResult};
use notewell_sync::{RemoteStore, SyncError, SyncResult};
use notewell_types::{EntityKind, EntityPayload, FolderData, NoteData};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Installs a fmt subscriber honoring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ts(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

/// A note payload with both timestamps set to `updated_ms`.
pub fn note(id: Uuid, title: &str, updated_ms: i64) -> EntityPayload {
    EntityPayload::Note(NoteData {
        id,
        title: title.to_string(),
        content: format!("content of {title}"),
        folder_id: None,
        pinned: false,
        created_at: ts(updated_ms),
        updated_at: ts(updated_ms),
    })
}

pub fn folder(id: Uuid, name: &str, updated_ms: i64) -> EntityPayload {
    EntityPayload::Folder(FolderData {
        id,
        name: name.to_string(),
        parent_id: None,
        created_at: ts(updated_ms),
        updated_at: ts(updated_ms),
    })
}

/// In-memory stand-in for the remote authoritative store.
///
/// Counts every call, can fail the next N mutations, and can delay each
/// call to widen race windows in concurrency tests.
#[derive(Default)]
pub struct MockRemote {
    entries: Mutex<HashMap<Uuid, EntityPayload>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    fail_next_writes: AtomicUsize,
    delay: Option<Duration>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every remote call, widening the window for overlap tests.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Seeds a record directly, bypassing call counting.
    pub fn seed(&self, payload: EntityPayload) {
        self.entries.lock().unwrap().insert(payload.id(), payload);
    }

    /// Makes the next `n` mutating calls fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_next_writes.store(n, Ordering::SeqCst);
    }

    pub fn get(&self, id: Uuid) -> Option<EntityPayload> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn total_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    async fn enter(&self, mutating: bool) -> SyncResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if mutating {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_next_writes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next_writes.store(remaining - 1, Ordering::SeqCst);
                return Err(SyncError::Remote("injected failure".to_string()));
            }
        } else {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn find_unique(&self, kind: EntityKind, id: Uuid) -> SyncResult<Option<EntityPayload>> {
        self.enter(false).await?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&id)
            .filter(|p| p.kind() == kind)
            .cloned())
    }

    async fn find_many(&self, kind: EntityKind) -> SyncResult<Vec<EntityPayload>> {
        self.enter(false).await?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.kind() == kind)
            .cloned()
            .collect())
    }

    async fn create(&self, payload: EntityPayload) -> SyncResult<()> {
        self.enter(true).await?;
        self.entries.lock().unwrap().insert(payload.id(), payload);
        Ok(())
    }

    async fn update(&self, id: Uuid, payload: EntityPayload) -> SyncResult<()> {
        self.enter(true).await?;
        self.entries.lock().unwrap().insert(id, payload);
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> SyncResult<()> {
        self.enter(true).await?;
        let mut entries = self.entries.lock().unwrap();
        if entries.get(&id).is_some_and(|p| p.kind() == kind) {
            entries.remove(&id);
        }
        Ok(())
    }
}

/// Adapter whose writes always fail, for queue degradation tests.
pub struct RejectingStore;

#[async_trait]
impl StorageAdapter for RejectingStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<serde_json::Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: serde_json::Value) -> StorageResult<()> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only backend").into())
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only backend").into())
    }

    async fn get_all(&self, _prefix: &str) -> StorageResult<BTreeMap<String, serde_json::Value>> {
        Ok(BTreeMap::new())
    }

    async fn clear(&self) -> StorageResult<()> {
        Ok(())
    }
}
