//! Note and folder payloads.
//!
//! The sync layer treats payloads as opaque blobs with a handful of uniform
//! accessors (id, kind, modification time, display name). Field-level merge
//! is out of scope, so nothing here exposes per-field diffing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of entity tracked by the sync engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Note,
    Folder,
}

impl EntityKind {
    /// Storage key prefix for this kind (e.g. `note:` / `folder:`).
    pub fn key_prefix(&self) -> &'static str {
        match self {
            EntityKind::Note => "note:",
            EntityKind::Folder => "folder:",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Note => f.write_str("note"),
            EntityKind::Folder => f.write_str("folder"),
        }
    }
}

/// A note record as the sync engine sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteData {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A folder record as the sync engine sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderData {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tagged union over the concrete payload types.
///
/// Serialized with an internal `kind` tag so stored and wire forms stay
/// self-describing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityPayload {
    Note(NoteData),
    Folder(FolderData),
}

impl EntityPayload {
    pub fn id(&self) -> Uuid {
        match self {
            EntityPayload::Note(n) => n.id,
            EntityPayload::Folder(f) => f.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Note(_) => EntityKind::Note,
            EntityPayload::Folder(_) => EntityKind::Folder,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            EntityPayload::Note(n) => n.updated_at,
            EntityPayload::Folder(f) => f.updated_at,
        }
    }

    pub fn set_updated_at(&mut self, at: DateTime<Utc>) {
        match self {
            EntityPayload::Note(n) => n.updated_at = at,
            EntityPayload::Folder(f) => f.updated_at = at,
        }
    }

    /// Human-facing name: a note's title or a folder's name.
    pub fn display_name(&self) -> &str {
        match self {
            EntityPayload::Note(n) => &n.title,
            EntityPayload::Folder(f) => &f.name,
        }
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        match self {
            EntityPayload::Note(n) => n.title = name.into(),
            EntityPayload::Folder(f) => f.name = name.into(),
        }
    }

    /// Assigns a fresh id, used when a resolved conflict keeps both copies.
    pub fn reassign_id(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        match self {
            EntityPayload::Note(n) => n.id = id,
            EntityPayload::Folder(f) => f.id = id,
        }
        id
    }

    /// Storage key for this payload (`note:{id}` / `folder:{id}`).
    pub fn storage_key(&self) -> String {
        format!("{}{}", self.kind().key_prefix(), self.id())
    }
}
