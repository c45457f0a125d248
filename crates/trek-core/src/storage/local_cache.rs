//! Per-kind entity lists and pending deletions, persisted as JSON blobs.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::KeyValueStore;
use crate::error::Result;
use crate::models::{Category, Entity, EntityId, EntityKind, Expense, IdRemap, Trip};

const ID_REMAP_KEY: &str = "@id_remap";

/// Queued remote deletion, scoped to the user whose collection holds the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingDelete {
    owner_id: String,
    id: EntityId,
}

/// Local cache over a key-value store.
///
/// The full list of a kind is read and rewritten on every mutation; record
/// counts per user are expected to stay in the hundreds.
pub struct LocalCache<S> {
    store: Arc<S>,
}

impl<S> Clone for LocalCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> LocalCache<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All cached records of one kind, in insertion order.
    pub async fn entities<T: Entity>(&self) -> Result<Vec<T>> {
        self.read_json(&T::KIND.cache_key()).await
    }

    /// Replace the cached list of one kind.
    pub async fn set_entities<T: Entity>(&self, entities: &[T]) -> Result<()> {
        let payload = serde_json::to_string(entities)?;
        self.store.set_item(&T::KIND.cache_key(), &payload).await
    }

    /// Remote ids of one owner whose deletion has not reached the remote
    /// store yet.
    pub async fn pending_deletes(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<EntityId>> {
        Ok(self
            .pending_delete_entries(kind)
            .await?
            .into_iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.id)
            .collect())
    }

    /// Queue a remote id for deletion; already queued ids are not repeated.
    pub async fn add_pending_delete(
        &self,
        kind: EntityKind,
        owner_id: &str,
        id: &EntityId,
    ) -> Result<()> {
        let mut entries = self.pending_delete_entries(kind).await?;
        let entry = PendingDelete {
            owner_id: owner_id.to_string(),
            id: id.clone(),
        };
        if entries.contains(&entry) {
            return Ok(());
        }
        entries.push(entry);
        self.set_pending_delete_entries(kind, &entries).await
    }

    /// Drop the given ids from one owner's queue, leaving other owners alone.
    pub async fn remove_pending_deletes(
        &self,
        kind: EntityKind,
        owner_id: &str,
        ids: &[EntityId],
    ) -> Result<()> {
        let mut entries = self.pending_delete_entries(kind).await?;
        let before = entries.len();
        entries.retain(|entry| entry.owner_id != owner_id || !ids.contains(&entry.id));
        if entries.len() == before {
            return Ok(());
        }
        self.set_pending_delete_entries(kind, &entries).await
    }

    async fn pending_delete_entries(&self, kind: EntityKind) -> Result<Vec<PendingDelete>> {
        self.read_json(&kind.pending_delete_key()).await
    }

    async fn set_pending_delete_entries(
        &self,
        kind: EntityKind,
        entries: &[PendingDelete],
    ) -> Result<()> {
        let key = kind.pending_delete_key();
        if entries.is_empty() {
            return self.store.remove_item(&key).await;
        }
        let payload = serde_json::to_string(entries)?;
        self.store.set_item(&key, &payload).await
    }

    /// Every local → remote id substitution recorded by past sync runs.
    pub async fn id_remap(&self) -> Result<IdRemap> {
        self.read_json(ID_REMAP_KEY).await
    }

    /// Merge new substitutions into the persisted remap.
    pub async fn record_id_remap(&self, entries: &IdRemap) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut remap = self.id_remap().await?;
        remap.extend(entries.iter().map(|(from, to)| (from.clone(), to.clone())));
        let payload = serde_json::to_string(&remap)?;
        self.store.set_item(ID_REMAP_KEY, &payload).await
    }

    /// Forget substitutions whose local id no cached record carries or points
    /// at any more. Returns how many entries were dropped.
    pub async fn prune_id_remap(&self) -> Result<usize> {
        let mut remap = self.id_remap().await?;
        if remap.is_empty() {
            return Ok(0);
        }

        let mut live = HashSet::new();
        self.collect_local_ids::<Trip>(&mut live).await?;
        self.collect_local_ids::<Category>(&mut live).await?;
        self.collect_local_ids::<Expense>(&mut live).await?;

        let before = remap.len();
        remap.retain(|local, _| live.contains(local));
        let pruned = before - remap.len();
        if pruned == 0 {
            return Ok(0);
        }

        if remap.is_empty() {
            self.store.remove_item(ID_REMAP_KEY).await?;
        } else {
            let payload = serde_json::to_string(&remap)?;
            self.store.set_item(ID_REMAP_KEY, &payload).await?;
        }
        Ok(pruned)
    }

    async fn collect_local_ids<T: Entity>(&self, live: &mut HashSet<EntityId>) -> Result<()> {
        for entity in self.entities::<T>().await? {
            live.extend(
                std::iter::once(entity.id())
                    .chain(entity.references())
                    .filter(|id| id.is_local())
                    .cloned(),
            );
        }
        Ok(())
    }

    async fn read_json<V>(&self, key: &str) -> Result<V>
    where
        V: serde::de::DeserializeOwned + Default,
    {
        match self.store.get_item(key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(V::default()),
        }
    }
}
