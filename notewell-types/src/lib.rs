//! Shared domain types for the Notewell sync core.
//!
//! Everything the sync engine, queue, and storage layers exchange lives
//! here: note/folder payloads, pending-mutation records, conflict and
//! state snapshots, configuration, and the lifecycle event union.

mod config;
mod entity;
mod event;
mod sync;

pub use config::{ConflictStrategy, SyncConfig, SyncConfigPatch};
pub use entity::{EntityKind, EntityPayload, FolderData, NoteData};
pub use event::SyncEvent;
pub use sync::{
    Resolution, ResolutionAction, SyncConflict, SyncEntity, SyncOperation, SyncQueueItem,
    SyncState, SyncStatus,
};
