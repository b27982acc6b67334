//! Contract for the remote authoritative store.

use crate::error::SyncResult;
use async_trait::async_trait;
use notewell_types::{EntityKind, EntityPayload};
use uuid::Uuid;

/// Per-entity-type CRUD operations exposed by the remote authority.
///
/// All calls are fallible with a generic error; the engine treats any
/// failure as transient and drives retries off it. Implementations are
/// typically HTTP clients, but nothing here assumes a wire format.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Looks up a single record, `None` if the remote has no copy.
    async fn find_unique(&self, kind: EntityKind, id: Uuid) -> SyncResult<Option<EntityPayload>>;

    /// Lists every remote record of the given kind.
    async fn find_many(&self, kind: EntityKind) -> SyncResult<Vec<EntityPayload>>;

    async fn create(&self, payload: EntityPayload) -> SyncResult<()>;

    async fn update(&self, id: Uuid, payload: EntityPayload) -> SyncResult<()>;

    async fn delete(&self, kind: EntityKind, id: Uuid) -> SyncResult<()>;
}
