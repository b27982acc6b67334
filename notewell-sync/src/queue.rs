//! Durable offline mutation queue.
//!
//! A mostly-FIFO buffer of pending mutations persisted through a storage
//! adapter under a fixed key, so it survives process restarts. An item is
//! removed only once its delivery is acknowledged; failed items move to
//! the tail, keeping a poison item from blocking the head.
//!
//! Persistence failures are logged and swallowed: an un-persistable queue
//! degrades to in-memory for the session rather than crashing the host.

use notewell_storage::StorageAdapter;
use notewell_types::{SyncEntity, SyncQueueItem};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

const QUEUE_KEY: &str = "offline-queue";

/// Durable queue of pending mutations.
pub struct OfflineQueue {
    adapter: Arc<dyn StorageAdapter>,
    items: VecDeque<SyncQueueItem>,
    max_retries: u32,
}

impl OfflineQueue {
    pub fn new(adapter: Arc<dyn StorageAdapter>, max_retries: u32) -> Self {
        Self {
            adapter,
            items: VecDeque::new(),
            max_retries,
        }
    }

    /// Changes the retry budget applied to newly enqueued items. Items
    /// already in the queue keep the budget they were created with.
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
    }

    /// Restores persisted items from the adapter. An unreadable or
    /// unparseable snapshot starts the queue empty with a warning.
    pub async fn load(&mut self) {
        match self.adapter.get(QUEUE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<SyncQueueItem>>(value) {
                Ok(items) => {
                    debug!("restored {} queued operations", items.len());
                    self.items = items.into();
                }
                Err(e) => warn!("persisted queue is unparseable, starting empty: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("failed to load persisted queue, starting empty: {e}"),
        }
    }

    /// Writes the current items back to the adapter; failures degrade the
    /// queue to in-memory-only for this session.
    async fn persist(&self) {
        let items: Vec<&SyncQueueItem> = self.items.iter().collect();
        let snapshot = match serde_json::to_value(&items) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to serialize queue, keeping in memory only: {e}");
                return;
            }
        };
        if let Err(e) = self.adapter.set(QUEUE_KEY, snapshot).await {
            warn!("failed to persist queue, keeping in memory only: {e}");
        }
    }

    /// Appends a mutation with a fresh retry budget and persists.
    pub async fn enqueue(&mut self, entity: SyncEntity) -> Uuid {
        let item = SyncQueueItem::new(entity, self.max_retries);
        let item_id = item.item_id;
        debug!(
            "queued {:?} {} for entity {}",
            item.entity.operation, item.entity.kind, item.entity.id
        );
        self.items.push_back(item);
        self.persist().await;
        item_id
    }

    /// Pops the head item.
    pub async fn dequeue(&mut self) -> Option<SyncQueueItem> {
        let item = self.items.pop_front();
        if item.is_some() {
            self.persist().await;
        }
        item
    }

    /// Inspects the head item without removing it.
    pub fn peek(&self) -> Option<&SyncQueueItem> {
        self.items.front()
    }

    /// Records a failed delivery for the identified item. If it has retry
    /// budget left it moves to the tail and `true` is returned; otherwise
    /// it is dropped (`false`) and the caller owns surfacing the error.
    pub async fn record_failure(&mut self, item_id: Uuid, error_msg: &str) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.item_id == item_id) else {
            return false;
        };
        let Some(mut item) = self.items.remove(pos) else {
            return false;
        };
        item.retry_count += 1;
        item.last_error = Some(error_msg.to_string());

        if item.can_retry() {
            debug!(
                "requeueing entity {} (attempt {}/{}): {error_msg}",
                item.entity.id, item.retry_count, item.max_retries
            );
            self.items.push_back(item);
            self.persist().await;
            true
        } else {
            error!(
                "abandoning entity {} after {} attempts: {error_msg}",
                item.entity.id, item.retry_count
            );
            self.persist().await;
            false
        }
    }

    /// Removes an item by id, returning whether it was present.
    pub async fn remove(&mut self, item_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.item_id != item_id);
        let removed = self.items.len() != before;
        if removed {
            self.persist().await;
        }
        removed
    }

    pub async fn clear(&mut self) {
        self.items.clear();
        self.persist().await;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of all pending items, head first.
    pub fn items(&self) -> Vec<SyncQueueItem> {
        self.items.iter().cloned().collect()
    }
}
