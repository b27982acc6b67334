//! Lifecycle events emitted by the sync manager for observers (UI layer).

use crate::sync::SyncConflict;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Events emitted over the manager's broadcast channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    SyncStarted,
    SyncCompleted { duration: Duration },
    SyncError { error: String },
    OfflineDetected,
    OnlineDetected,
    /// Queue drain finished; `processed` counts successfully delivered items.
    QueueProcessed { processed: usize },
    ConflictDetected { conflict: SyncConflict },
    ConflictResolved { entity_id: Uuid },
}
