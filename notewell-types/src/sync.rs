//! Pending mutations, conflicts, and observable sync state.

use crate::entity::{EntityKind, EntityPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The mutation a queued entity represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
    /// Re-parenting a note into another folder (or a folder under a new
    /// parent). Delivered to the remote store as an update.
    Move,
}

/// One pending mutation, immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncEntity {
    /// Id of the entity the mutation targets.
    pub id: Uuid,
    pub kind: EntityKind,
    pub operation: SyncOperation,
    pub payload: EntityPayload,
    pub queued_at: DateTime<Utc>,
}

impl SyncEntity {
    pub fn new(operation: SyncOperation, payload: EntityPayload) -> Self {
        Self {
            id: payload.id(),
            kind: payload.kind(),
            operation,
            payload,
            queued_at: Utc::now(),
        }
    }
}

/// A queued mutation with retry bookkeeping.
///
/// `retry_count` and `last_error` are mutated in place by the queue on each
/// failed delivery; the item is destroyed on success or once `retry_count`
/// reaches `max_retries`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub item_id: Uuid,
    pub entity: SyncEntity,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    pub fn new(entity: SyncEntity, max_retries: u32) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            entity,
            retry_count: 0,
            max_retries,
            last_error: None,
        }
    }

    /// True if this item still has retry budget left.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Both replicas changed the same entity independently.
///
/// Created transiently during a sync pass; only parked in
/// [`SyncState::conflicts`] when the strategy defers to manual resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub entity_id: Uuid,
    pub kind: EntityKind,
    pub local: EntityPayload,
    pub remote: EntityPayload,
    pub local_updated_at: DateTime<Utc>,
    pub remote_updated_at: DateTime<Utc>,
}

impl SyncConflict {
    pub fn new(local: EntityPayload, remote: EntityPayload) -> Self {
        Self {
            entity_id: local.id(),
            kind: local.kind(),
            local_updated_at: local.updated_at(),
            remote_updated_at: remote.updated_at(),
            local,
            remote,
        }
    }
}

/// What the resolver decided for a conflict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved: bool,
    pub action: ResolutionAction,
}

/// The concrete action a resolution carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Write the server payload over the local replica.
    UseServer { payload: EntityPayload },
    /// Push the local payload over the remote copy.
    UseClient { payload: EntityPayload },
    /// Keep both: the local copy (renamed, fresh id) and the untouched
    /// server copy are persisted as distinct entities.
    Merge {
        local: EntityPayload,
        remote: EntityPayload,
    },
    /// Unresolved; the conflict is parked for out-of-band resolution.
    Defer,
}

/// Lifecycle status of the sync manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Offline,
    Error,
}

/// Observable state snapshot, one instance per sync manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub pending_operations: usize,
    pub conflicts: Vec<SyncConflict>,
    pub errors: Vec<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_sync_at: None,
            pending_operations: 0,
            conflicts: Vec::new(),
            errors: Vec::new(),
        }
    }
}
