//! Conflict detection and resolution.
//!
//! Both functions are pure: detection compares `updated_at` timestamps
//! against the configured echo window, resolution maps a detected conflict
//! to an action under the configured strategy. Records are opaque blobs
//! here — field-level merging is explicitly out of scope.

use notewell_types::{
    ConflictStrategy, EntityPayload, Resolution, ResolutionAction, SyncConflict,
};
use std::time::Duration;

/// Suffix applied to the local copy's display name under `KeepBoth`.
const LOCAL_COPY_SUFFIX: &str = " (Local Copy)";

/// Compares two versions of the same entity.
///
/// Equal timestamps mean the same known state. A gap inside `window` is
/// assumed to be one logical update observed twice (e.g. the echo of a
/// just-pushed write) and is not a conflict. Anything beyond the window
/// means both replicas changed independently since they last agreed.
pub fn detect_conflict(
    local: &EntityPayload,
    remote: &EntityPayload,
    window: Duration,
) -> Option<SyncConflict> {
    let gap_ms = (local.updated_at() - remote.updated_at())
        .num_milliseconds()
        .unsigned_abs() as u128;
    if gap_ms <= window.as_millis() {
        return None;
    }
    Some(SyncConflict::new(local.clone(), remote.clone()))
}

/// Decides what to do with a detected conflict.
pub fn resolve(conflict: &SyncConflict, strategy: ConflictStrategy) -> Resolution {
    match strategy {
        ConflictStrategy::LastWriteWins => {
            // Ties go to the server copy.
            if conflict.remote_updated_at >= conflict.local_updated_at {
                use_server(conflict)
            } else {
                use_client(conflict)
            }
        }
        ConflictStrategy::ServerWins => use_server(conflict),
        ConflictStrategy::ClientWins => use_client(conflict),
        ConflictStrategy::KeepBoth => {
            let mut local = conflict.local.clone();
            local.set_display_name(format!("{}{LOCAL_COPY_SUFFIX}", local.display_name()));
            Resolution {
                resolved: true,
                action: ResolutionAction::Merge {
                    local,
                    remote: conflict.remote.clone(),
                },
            }
        }
        ConflictStrategy::Manual => Resolution {
            resolved: false,
            action: ResolutionAction::Defer,
        },
    }
}

fn use_server(conflict: &SyncConflict) -> Resolution {
    Resolution {
        resolved: true,
        action: ResolutionAction::UseServer {
            payload: conflict.remote.clone(),
        },
    }
}

fn use_client(conflict: &SyncConflict) -> Resolution {
    Resolution {
        resolved: true,
        action: ResolutionAction::UseClient {
            payload: conflict.local.clone(),
        },
    }
}
