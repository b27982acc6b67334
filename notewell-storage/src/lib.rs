//! Local persistence backends for the Notewell sync core.
//!
//! The sync engine talks to local storage exclusively through the
//! [`StorageAdapter`] contract: `get` / `set` / `delete` / `get_all` /
//! `clear`, with every key namespaced by a configured prefix so unrelated
//! data can share one backend.
//!
//! # Backends
//!
//! - [`JsonFileStore`] — a synchronous key-value file exposed through the
//!   async contract; suited to small volumes (config, the offline queue).
//! - [`SqliteStore`] — a genuinely asynchronous indexed store for bulk
//!   entity volumes, one object table per instance, lazily opened.
//! - [`MemoryStore`] — ephemeral, for tests and throwaway sessions.
//!
//! # Failure policy
//!
//! Bulk reads never fail on a single bad record: undecodable entries are
//! skipped with a warning. Writes (`set` / `delete`) always propagate
//! failures, since a silently lost write is a correctness risk for sync.

mod adapter;
mod error;
mod json_store;
mod sqlite_store;

pub use adapter::{MemoryStore, StorageAdapter};
pub use error::{StorageError, StorageResult};
pub use json_store::JsonFileStore;
pub use sqlite_store::SqliteStore;
