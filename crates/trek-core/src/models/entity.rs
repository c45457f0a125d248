//! Shape shared by trips, categories and expenses

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{EntityId, SyncState};
use crate::Result;

/// Substitutions of local ids by the remote ids they were pushed under.
pub type IdRemap = HashMap<EntityId, EntityId>;

/// The three entity kinds, in the order they must be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Trip,
    Category,
    Expense,
}

impl EntityKind {
    /// Parents before children.
    pub const SYNC_ORDER: [Self; 3] = [Self::Trip, Self::Category, Self::Expense];

    /// Remote collection name, scoped under `users/{owner}`.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Trip => "travels",
            Self::Category => "categories",
            Self::Expense => "expenses",
        }
    }

    /// Field holding the parent reference, used as the remote list filter.
    #[must_use]
    pub const fn parent_field(self) -> Option<&'static str> {
        match self {
            Self::Trip => None,
            Self::Category => Some("travel_id"),
            Self::Expense => Some("category_id"),
        }
    }

    /// Local cache key for the entity list.
    #[must_use]
    pub fn cache_key(self) -> String {
        format!("@offline_{}", self.collection())
    }

    /// Local cache key for remote ids awaiting deletion.
    #[must_use]
    pub fn pending_delete_key(self) -> String {
        format!("@pending_deletes_{}", self.collection())
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trip => "trip",
            Self::Category => "category",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bookkeeping fields carried by every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: EntityId,
    /// Opaque identifier of the owning user
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub sync_state: SyncState,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl EntityMeta {
    /// Metadata for a record that only exists on this device so far.
    #[must_use]
    pub fn new_local() -> Self {
        Self {
            id: EntityId::new_local(),
            owner_id: String::new(),
            sync_state: SyncState::LocalUnsynced,
            created_at: crate::util::unix_millis_now(),
            updated_at: None,
        }
    }
}

/// Behaviour bundle of one entity kind.
///
/// The generic store, cache and reconciler only ever talk to records through
/// this trait.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial update payload; `None` fields are left untouched.
    type Patch: Clone + fmt::Debug + Serialize + Send + Sync;

    const KIND: EntityKind;

    fn meta(&self) -> &EntityMeta;

    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Direct owner in the hierarchy (trip for a category, category for an expense).
    fn parent_id(&self) -> Option<&EntityId>;

    /// Every id this record points at.
    fn references(&self) -> Vec<&EntityId> {
        self.parent_id().into_iter().collect()
    }

    /// Rewrite references that were pushed under a new id. Returns whether
    /// anything changed.
    fn remap_references(&mut self, _remap: &IdRemap) -> bool {
        false
    }

    /// Required relational fields, checked by the store before any write.
    fn validate_relations(&self) -> Result<()>;

    /// Form-level checks run by the manager before delegating.
    fn validate_form(&self) -> Result<()>;

    /// Content-derived key used to spot records a previous sync already pushed.
    fn content_key(&self) -> String;

    fn apply_patch(&mut self, patch: &Self::Patch);

    fn id(&self) -> &EntityId {
        &self.meta().id
    }

    fn sync_state(&self) -> SyncState {
        self.meta().sync_state
    }

    /// Whether any referenced parent still lacks a remote id.
    fn has_local_references(&self) -> bool {
        self.references().iter().any(|id| id.is_local())
    }
}

/// Replace `id` in place when the remap knows it.
pub(crate) fn remap_id(id: &mut EntityId, remap: &IdRemap) -> bool {
    match remap.get(id) {
        Some(replacement) if replacement != id => {
            *id = replacement.clone();
            true
        }
        _ => false,
    }
}
