//! Sync error types.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote-store call failed. No error taxonomy is assumed beyond the
    /// message; per-item failures drive the retry counter, pass-level ones
    /// abort the current sync.
    #[error("remote store error: {0}")]
    Remote(String),

    #[error("storage error: {0}")]
    Storage(#[from] notewell_storage::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
