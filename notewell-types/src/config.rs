//! Sync engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy used when both replicas changed the same entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Newer `updated_at` wins outright.
    LastWriteWins,
    /// The remote copy always wins.
    ServerWins,
    /// The local copy always wins.
    ClientWins,
    /// Retain both copies; the local one is renamed to disambiguate.
    KeepBoth,
    /// Leave the conflict parked for out-of-band resolution.
    Manual,
}

/// Configuration for the sync manager.
///
/// Supplied at construction and replaceable at runtime via
/// `SyncManager::update_config`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Master switch; when false, `sync()` is a no-op.
    pub enabled: bool,

    /// Run periodic background syncs.
    pub auto_sync: bool,

    /// Interval between periodic syncs.
    pub sync_interval: Duration,

    pub conflict_strategy: ConflictStrategy,

    /// Force offline behavior even while connectivity is up.
    pub offline_mode: bool,

    /// Entities processed per chunk during a diff pass before yielding.
    pub batch_size: usize,

    /// Default retry budget for queued mutations.
    pub retry_attempts: u32,

    /// Delay between retries of a failed queue item.
    pub retry_delay: Duration,

    /// Timestamp gap under which two versions are treated as the same
    /// logical update (echo suppression), not a conflict.
    pub conflict_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_sync: true,
            sync_interval: Duration::from_secs(30),
            conflict_strategy: ConflictStrategy::LastWriteWins,
            offline_mode: false,
            batch_size: 50,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            conflict_window: Duration::from_millis(5000),
        }
    }
}

/// Partial config for runtime updates; `None` fields keep their value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncConfigPatch {
    pub enabled: Option<bool>,
    pub auto_sync: Option<bool>,
    pub sync_interval: Option<Duration>,
    pub conflict_strategy: Option<ConflictStrategy>,
    pub offline_mode: Option<bool>,
    pub batch_size: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub conflict_window: Option<Duration>,
}

impl SyncConfig {
    /// Applies a patch, returning the merged config.
    pub fn merged(&self, patch: SyncConfigPatch) -> Self {
        Self {
            enabled: patch.enabled.unwrap_or(self.enabled),
            auto_sync: patch.auto_sync.unwrap_or(self.auto_sync),
            sync_interval: patch.sync_interval.unwrap_or(self.sync_interval),
            conflict_strategy: patch.conflict_strategy.unwrap_or(self.conflict_strategy),
            offline_mode: patch.offline_mode.unwrap_or(self.offline_mode),
            batch_size: patch.batch_size.unwrap_or(self.batch_size),
            retry_attempts: patch.retry_attempts.unwrap_or(self.retry_attempts),
            retry_delay: patch.retry_delay.unwrap_or(self.retry_delay),
            conflict_window: patch.conflict_window.unwrap_or(self.conflict_window),
        }
    }
}
