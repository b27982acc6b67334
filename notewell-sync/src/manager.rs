//! Sync manager — orchestrates the bidirectional sync process.
//!
//! The manager owns the sync state, drains the offline queue against the
//! remote store, runs the local↔remote diff passes, routes conflicts
//! through the resolver, and emits lifecycle events over a broadcast
//! channel. It is long-lived for the session; `destroy` stops the
//! background scheduling task without aborting an in-flight pass.
//!
//! Mutual exclusion between overlapping passes is a status guard, not a
//! lock: a `sync()` call while one is running is a silent no-op.

use crate::connectivity;
use crate::error::SyncResult;
use crate::queue::OfflineQueue;
use crate::remote::RemoteStore;
use crate::resolver;
use chrono::Utc;
use notewell_storage::StorageAdapter;
use notewell_types::{
    EntityKind, EntityPayload, ResolutionAction, SyncConfig, SyncConfigPatch, SyncConflict,
    SyncEntity, SyncEvent, SyncOperation, SyncState, SyncStatus,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type TokioMutex<T> = tokio::sync::Mutex<T>;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Error records kept in [`SyncState::errors`]; older ones roll off.
const MAX_ERROR_RECORDS: usize = 32;

fn push_error(state: &mut SyncState, message: String) {
    if state.errors.len() == MAX_ERROR_RECORDS {
        state.errors.remove(0);
    }
    state.errors.push(message);
}

struct Inner {
    /// Local replica of notes/folders, keyed `note:{id}` / `folder:{id}`.
    local: Arc<dyn StorageAdapter>,
    remote: Arc<dyn RemoteStore>,
    queue: TokioMutex<OfflineQueue>,
    config: Mutex<SyncConfig>,
    state: Mutex<SyncState>,
    connectivity: watch::Receiver<bool>,
    events: broadcast::Sender<SyncEvent>,
    shutdown: Notify,
    background: Mutex<Option<JoinHandle<()>>>,
}

/// The sync orchestrator. One instance per local replica, constructed with
/// injected dependencies — no ambient globals.
///
/// Cloning is cheap and yields a handle to the same manager.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<Inner>,
}

impl SyncManager {
    /// Creates a manager over the given replica store, queue store, remote
    /// authority, and connectivity signal.
    ///
    /// The queue usually lives on a small synchronous backend (it is
    /// rewritten on every mutation) while the replica store holds the bulk
    /// entity volume; nothing stops both from sharing one adapter.
    pub fn new(
        local: Arc<dyn StorageAdapter>,
        queue_store: Arc<dyn StorageAdapter>,
        remote: Arc<dyn RemoteStore>,
        connectivity: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let queue = OfflineQueue::new(queue_store, config.retry_attempts);
        Self {
            inner: Arc::new(Inner {
                local,
                remote,
                queue: TokioMutex::new(queue),
                config: Mutex::new(config),
                state: Mutex::new(SyncState::default()),
                connectivity,
                events,
                shutdown: Notify::new(),
                background: Mutex::new(None),
            }),
        }
    }

    /// Convenience constructor that also creates the connectivity pair,
    /// returning the host-facing handle alongside the manager.
    pub fn with_connectivity(
        local: Arc<dyn StorageAdapter>,
        queue_store: Arc<dyn StorageAdapter>,
        remote: Arc<dyn RemoteStore>,
        config: SyncConfig,
    ) -> (Self, connectivity::ConnectivityHandle) {
        let (handle, rx) = connectivity::connectivity_channel(true);
        (Self::new(local, queue_store, remote, rx, config), handle)
    }

    /// Restores the persisted queue and spawns the background scheduling
    /// task (periodic ticks + connectivity transitions). Idempotent.
    pub async fn initialize(&self) {
        let pending = {
            let mut queue = self.inner.queue.lock().await;
            queue.load().await;
            queue.len()
        };
        self.inner.state.lock().unwrap().pending_operations = pending;

        let mut background = self.inner.background.lock().unwrap();
        if background.is_none() {
            let manager = self.clone();
            let rx = self.inner.connectivity.clone();
            *background = Some(tokio::spawn(async move {
                manager.run_background(rx).await;
            }));
            info!("sync manager initialized ({pending} pending operations)");
        }
    }

    /// Stops future scheduling and waits for the background task to exit.
    /// An in-flight pass is not forcibly aborted.
    pub async fn destroy(&self) {
        self.inner.shutdown.notify_one();
        let handle = self.inner.background.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("sync manager destroyed");
    }

    /// Appends a mutation to the offline queue, returning the queue item id.
    /// The mutation is delivered on the next sync pass.
    pub async fn queue_operation(&self, entity: SyncEntity) -> Uuid {
        let (item_id, pending) = {
            let mut queue = self.inner.queue.lock().await;
            let item_id = queue.enqueue(entity).await;
            (item_id, queue.len())
        };
        self.inner.state.lock().unwrap().pending_operations = pending;
        item_id
    }

    /// Snapshot of the observable sync state.
    pub fn get_state(&self) -> SyncState {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn get_config(&self) -> SyncConfig {
        self.inner.config.lock().unwrap().clone()
    }

    /// Applies a partial config update at runtime. Interval changes take
    /// effect on the next scheduling cycle.
    pub async fn update_config(&self, patch: SyncConfigPatch) {
        let merged = {
            let mut config = self.inner.config.lock().unwrap();
            *config = config.merged(patch);
            config.clone()
        };
        self.inner
            .queue
            .lock()
            .await
            .set_max_retries(merged.retry_attempts);
        debug!("sync config updated");
    }

    /// Subscribes to lifecycle events. Each receiver observes every event
    /// emitted after the call; dropping it unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine; events are fire-and-forget.
        let _ = self.inner.events.send(event);
    }

    /// Flips the status to `Syncing` unless a pass is already running.
    fn begin_pass(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if state.status == SyncStatus::Syncing {
            return false;
        }
        state.status = SyncStatus::Syncing;
        true
    }

    /// Runs one full sync pass: drain the queue, push local changes, pull
    /// remote ones. Silent no-op when disabled, offline, or already running.
    pub async fn sync(&self) -> SyncResult<()> {
        let config = self.get_config();
        if !config.enabled {
            debug!("sync disabled, skipping");
            return Ok(());
        }
        if config.offline_mode {
            debug!("offline mode forced on, skipping sync");
            return Ok(());
        }
        if !*self.inner.connectivity.borrow() {
            debug!("offline, skipping sync");
            {
                let mut state = self.inner.state.lock().unwrap();
                if state.status != SyncStatus::Syncing {
                    state.status = SyncStatus::Offline;
                }
            }
            self.emit(SyncEvent::OfflineDetected);
            return Ok(());
        }
        if !self.begin_pass() {
            debug!("sync already in progress, ignoring");
            return Ok(());
        }

        let started = Instant::now();
        self.emit(SyncEvent::SyncStarted);
        info!("sync pass started");

        match self.run_pass(&config).await {
            Ok(()) => {
                let pending = self.inner.queue.lock().await.len();
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.status = SyncStatus::Idle;
                    state.last_sync_at = Some(Utc::now());
                    state.pending_operations = pending;
                }
                let duration = started.elapsed();
                info!("sync pass completed in {duration:?}");
                self.emit(SyncEvent::SyncCompleted { duration });
                Ok(())
            }
            Err(e) => {
                error!("sync pass failed: {e}");
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.status = SyncStatus::Error;
                    push_error(&mut state, e.to_string());
                }
                self.emit(SyncEvent::SyncError {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_pass(&self, config: &SyncConfig) -> SyncResult<()> {
        let processed = self.drain_queue(config).await?;
        self.emit(SyncEvent::QueueProcessed { processed });
        self.push_local_changes(config).await?;
        self.pull_remote_changes(config).await?;
        Ok(())
    }

    /// Drains the offline queue to empty, one item at a time. An item
    /// leaves the queue only after the remote acknowledged it, so a crash
    /// mid-delivery re-applies the mutation on the next pass. A failed
    /// delivery re-queues the item at the tail until its own retry budget
    /// runs out; an exhausted item is dropped with an error record.
    ///
    /// The queue lock is held per item, so UI calls appending operations
    /// mid-drain interleave safely (and extend the drain).
    async fn drain_queue(&self, config: &SyncConfig) -> SyncResult<usize> {
        let mut processed = 0usize;
        loop {
            let item = self.inner.queue.lock().await.peek().cloned();
            let Some(item) = item else { break };

            match self.deliver(&item.entity).await {
                Ok(()) => {
                    self.inner.queue.lock().await.remove(item.item_id).await;
                    processed += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    let requeued = self
                        .inner
                        .queue
                        .lock()
                        .await
                        .record_failure(item.item_id, &message)
                        .await;
                    if requeued {
                        tokio::time::sleep(config.retry_delay).await;
                    } else {
                        push_error(
                            &mut self.inner.state.lock().unwrap(),
                            format!(
                                "dropped queued operation for entity {} after {} attempts: {message}",
                                item.entity.id,
                                item.retry_count + 1
                            ),
                        );
                    }
                }
            }
        }
        debug!("queue drained ({processed} delivered)");
        Ok(processed)
    }

    /// Executes one queued mutation against the remote store. Moves are
    /// delivered as updates — the payload already carries the new parent.
    async fn deliver(&self, entity: &SyncEntity) -> SyncResult<()> {
        match entity.operation {
            SyncOperation::Create => self.inner.remote.create(entity.payload.clone()).await,
            SyncOperation::Update | SyncOperation::Move => {
                self.inner
                    .remote
                    .update(entity.id, entity.payload.clone())
                    .await
            }
            SyncOperation::Delete => self.inner.remote.delete(entity.kind, entity.id).await,
        }
    }

    /// Local → remote diff pass: create what the remote is missing, push
    /// what is strictly newer locally, route genuine conflicts through the
    /// resolver.
    async fn push_local_changes(&self, config: &SyncConfig) -> SyncResult<()> {
        for kind in [EntityKind::Note, EntityKind::Folder] {
            let locals = self.inner.local.get_all(kind.key_prefix()).await?;
            let mut scanned = 0usize;
            for (key, value) in locals {
                let local: EntityPayload = match serde_json::from_value(value) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("skipping undecodable local record {key}: {e}");
                        continue;
                    }
                };

                match self.inner.remote.find_unique(kind, local.id()).await? {
                    None => {
                        debug!("pushing new {kind} {} to remote", local.id());
                        self.inner.remote.create(local).await?;
                    }
                    Some(remote_copy) => {
                        if let Some(conflict) =
                            resolver::detect_conflict(&local, &remote_copy, config.conflict_window)
                        {
                            self.handle_conflict(conflict, config).await?;
                        } else if local.updated_at() > remote_copy.updated_at() {
                            debug!("pushing newer {kind} {} to remote", local.id());
                            self.inner.remote.update(local.id(), local).await?;
                        }
                    }
                }

                scanned += 1;
                if scanned % config.batch_size.max(1) == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }
        Ok(())
    }

    /// Remote → local diff pass: pull what is missing locally, overwrite
    /// what is strictly newer remotely, again routed through conflict
    /// detection first.
    async fn pull_remote_changes(&self, config: &SyncConfig) -> SyncResult<()> {
        for kind in [EntityKind::Note, EntityKind::Folder] {
            let remotes = self.inner.remote.find_many(kind).await?;
            for (scanned, remote_copy) in remotes.into_iter().enumerate() {
                let key = remote_copy.storage_key();
                let local = self
                    .inner
                    .local
                    .get(&key)
                    .await?
                    .and_then(|value| match serde_json::from_value(value) {
                        Ok(payload) => Some(payload),
                        Err(e) => {
                            warn!("treating undecodable local record {key} as absent: {e}");
                            None
                        }
                    });

                match local {
                    None => {
                        debug!("pulling {kind} {} into local storage", remote_copy.id());
                        self.write_local(&remote_copy).await?;
                    }
                    Some(local) => {
                        if let Some(conflict) =
                            resolver::detect_conflict(&local, &remote_copy, config.conflict_window)
                        {
                            self.handle_conflict(conflict, config).await?;
                        } else if remote_copy.updated_at() > local.updated_at() {
                            debug!("updating local {kind} {} from remote", remote_copy.id());
                            self.write_local(&remote_copy).await?;
                        }
                    }
                }

                if (scanned + 1) % config.batch_size.max(1) == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }
        Ok(())
    }

    async fn write_local(&self, payload: &EntityPayload) -> SyncResult<()> {
        self.inner
            .local
            .set(&payload.storage_key(), serde_json::to_value(payload)?)
            .await?;
        Ok(())
    }

    /// Resolves a detected conflict and applies the outcome to whichever
    /// side needs it. Under the manual strategy the conflict is parked in
    /// `state.conflicts` for out-of-band resolution.
    async fn handle_conflict(&self, conflict: SyncConflict, config: &SyncConfig) -> SyncResult<()> {
        let entity_id = conflict.entity_id;
        {
            // A conflict already parked for manual resolution stays parked;
            // re-detecting it on later passes is not news.
            let state = self.inner.state.lock().unwrap();
            if state.conflicts.iter().any(|c| c.entity_id == entity_id) {
                return Ok(());
            }
        }
        warn!(
            "conflict detected for {} {entity_id} (local {} vs remote {})",
            conflict.kind, conflict.local_updated_at, conflict.remote_updated_at
        );
        self.emit(SyncEvent::ConflictDetected {
            conflict: conflict.clone(),
        });

        let resolution = resolver::resolve(&conflict, config.conflict_strategy);
        match resolution.action {
            ResolutionAction::UseServer { payload } => {
                self.write_local(&payload).await?;
                self.emit(SyncEvent::ConflictResolved { entity_id });
            }
            ResolutionAction::UseClient { payload } => {
                self.inner.remote.update(entity_id, payload).await?;
                self.emit(SyncEvent::ConflictResolved { entity_id });
            }
            ResolutionAction::Merge {
                local: mut local_copy,
                remote: server_copy,
            } => {
                // Server copy keeps the original id on both replicas; the
                // renamed local copy becomes a brand-new entity everywhere.
                self.write_local(&server_copy).await?;
                local_copy.reassign_id();
                self.write_local(&local_copy).await?;
                self.inner.remote.create(local_copy).await?;
                self.emit(SyncEvent::ConflictResolved { entity_id });
            }
            ResolutionAction::Defer => {
                self.inner.state.lock().unwrap().conflicts.push(conflict);
            }
        }
        Ok(())
    }

    /// Background scheduling loop: periodic syncs plus connectivity
    /// transitions. Exits on `destroy`.
    async fn run_background(&self, mut connectivity: watch::Receiver<bool>) {
        debug!("sync manager background task started");
        loop {
            // Re-read the interval each cycle so config updates apply
            // without restarting the task.
            let interval = self.get_config().sync_interval;
            tokio::select! {
                _ = self.inner.shutdown.notified() => {
                    debug!("sync manager background task stopping");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let config = self.get_config();
                    if config.enabled && config.auto_sync {
                        if let Err(e) = self.sync().await {
                            warn!("periodic sync failed: {e}");
                        }
                    }
                }
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        debug!("connectivity channel closed, stopping background task");
                        break;
                    }
                    let online = *connectivity.borrow_and_update();
                    if online {
                        info!("connectivity restored");
                        self.emit(SyncEvent::OnlineDetected);
                        {
                            let mut state = self.inner.state.lock().unwrap();
                            if state.status == SyncStatus::Offline {
                                state.status = SyncStatus::Idle;
                            }
                        }
                        if self.get_config().enabled {
                            if let Err(e) = self.sync().await {
                                warn!("online-triggered sync failed: {e}");
                            }
                        }
                    } else {
                        info!("connectivity lost");
                        if !self.get_config().offline_mode {
                            self.emit(SyncEvent::OfflineDetected);
                            let mut state = self.inner.state.lock().unwrap();
                            if state.status != SyncStatus::Syncing {
                                state.status = SyncStatus::Offline;
                            }
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("state", &self.get_state().status)
            .finish_non_exhaustive()
    }
}
