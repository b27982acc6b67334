//! Bidirectional offline sync engine for Notewell.
//!
//! Reconciles a device-local replica of notes/folders with a remote
//! authoritative store across unreliable connectivity:
//! - Durable offline mutation queue with per-item retry bookkeeping
//! - Timestamp-based conflict detection with a configurable echo window
//! - Pluggable conflict strategies (last-write-wins, server/client wins,
//!   keep-both, manual)
//! - Periodic and connectivity-triggered sync scheduling
//! - Typed lifecycle events over a broadcast channel
//!
//! The engine assumes exactly one local replica and one remote authority,
//! treats records as opaque blobs (no field-level merging), and recovers
//! from partial failures by entity-level idempotent re-application rather
//! than exactly-once delivery.
//!
//! Logging goes through `tracing`; hosts redirect or silence output by
//! installing (or not installing) a subscriber.

mod connectivity;
mod error;
mod manager;
mod queue;
pub mod remote;
pub mod resolver;

pub use connectivity::{connectivity_channel, ConnectivityHandle};
pub use error::{SyncError, SyncResult};
pub use manager::SyncManager;
pub use queue::OfflineQueue;
pub use remote::RemoteStore;
