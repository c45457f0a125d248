//! Generic store routing each write to the remote store or the local cache.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Entity, EntityId, SyncState};
use crate::remote::{
    collection_path, decode_entity, encode_entity, encode_patch, FieldFilter, RemoteStore,
};
use crate::storage::{KeyValueStore, LocalCache};
use crate::util::unix_millis_now;

/// Persistence of one entity kind.
///
/// Every operation takes the caller's view of connectivity; the store never
/// probes the network itself.
pub struct EntityStore<T, R, S> {
    remote: Arc<R>,
    cache: LocalCache<S>,
    _kind: PhantomData<fn() -> T>,
}

impl<T, R, S> Clone for EntityStore<T, R, S> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            cache: self.cache.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: Entity, R: RemoteStore, S: KeyValueStore> EntityStore<T, R, S> {
    pub const fn new(remote: Arc<R>, cache: LocalCache<S>) -> Self {
        Self {
            remote,
            cache,
            _kind: PhantomData,
        }
    }

    /// Persist a new record.
    ///
    /// Online saves go to the remote store unless the record still points at
    /// a parent that only exists locally.
    pub async fn save(&self, owner_id: &str, mut entity: T, is_online: bool) -> Result<T> {
        entity.meta_mut().owner_id = owner_id.to_string();
        let remap = self.cache.id_remap().await?;
        entity.remap_references(&remap);
        entity.validate_relations()?;

        if is_online {
            if !entity.has_local_references() {
                return self.save_remote(owner_id, entity).await;
            }
            tracing::info!(
                "Parent of new {} is not synced yet; saving locally",
                T::KIND
            );
        }
        self.save_local(entity).await
    }

    async fn save_remote(&self, owner_id: &str, entity: T) -> Result<T> {
        let data = encode_entity(&entity, false)?;
        let document = self
            .remote
            .add(&collection_path(owner_id, T::KIND), data)
            .await?;
        let saved: T = decode_entity(document)?;
        tracing::debug!("Saved {} {} remotely", T::KIND, saved.id());

        if let Err(error) = self.upsert_mirror(saved.clone()).await {
            tracing::warn!("Failed to mirror saved {}: {}", T::KIND, error);
        }
        Ok(saved)
    }

    async fn save_local(&self, mut entity: T) -> Result<T> {
        {
            let meta = entity.meta_mut();
            if !meta.id.is_local() {
                meta.id = EntityId::new_local();
            }
            meta.sync_state = SyncState::LocalUnsynced;
            meta.updated_at = None;
        }

        let mut entities = self.cache.entities::<T>().await?;
        entities.push(entity.clone());
        self.cache.set_entities(&entities).await?;
        tracing::debug!("Saved {} {} locally", T::KIND, entity.id());
        Ok(entity)
    }

    /// Apply a partial update and return the updated record.
    pub async fn update(
        &self,
        owner_id: &str,
        id: &EntityId,
        patch: &T::Patch,
        is_online: bool,
    ) -> Result<T> {
        if is_online && id.is_remote_shaped() {
            return self.update_remote(owner_id, id, patch).await;
        }

        let mut entities = self.cache.entities::<T>().await?;
        let entity = entities
            .iter_mut()
            .find(|entity| entity.id() == id && entity.meta().owner_id == owner_id)
            .ok_or_else(|| Error::NotFound(format!("{} {id}", T::KIND)))?;

        let mut updated = entity.clone();
        updated.apply_patch(patch);
        updated.validate_relations()?;
        let meta = updated.meta_mut();
        meta.sync_state = meta.sync_state.after_local_edit();
        meta.updated_at = Some(unix_millis_now());
        *entity = updated.clone();

        self.cache.set_entities(&entities).await?;
        tracing::debug!(
            "Updated {} {} locally ({:?})",
            T::KIND,
            id,
            updated.sync_state()
        );
        Ok(updated)
    }

    async fn update_remote(&self, owner_id: &str, id: &EntityId, patch: &T::Patch) -> Result<T> {
        let patched = self
            .cache
            .entities::<T>()
            .await?
            .into_iter()
            .find(|entity| entity.id() == id)
            .map(|mut entity| {
                entity.apply_patch(patch);
                entity.validate_relations().map(|()| entity)
            })
            .transpose()?;

        // A dirty mirror still holds offline edits the remote has not seen, so
        // the whole record goes out instead of just the patch.
        let updated_at = unix_millis_now();
        let payload = match &patched {
            Some(entity) if entity.sync_state() == SyncState::RemoteDirty => {
                let mut fields = encode_entity(entity, false)?;
                fields.insert("updated_at".to_string(), updated_at.into());
                fields
            }
            _ => encode_patch(patch, updated_at)?,
        };

        let collection = collection_path(owner_id, T::KIND);
        self.remote.update(&collection, id.value(), payload).await?;
        tracing::debug!("Updated {} {} remotely", T::KIND, id);

        let updated = match patched {
            Some(mut entity) => {
                let meta = entity.meta_mut();
                meta.sync_state = SyncState::RemoteSynced;
                meta.updated_at = Some(updated_at);
                entity
            }
            None => self.fetch_remote(owner_id, id).await?,
        };

        if let Err(error) = self.upsert_mirror(updated.clone()).await {
            tracing::warn!("Failed to mirror updated {}: {}", T::KIND, error);
        }
        Ok(updated)
    }

    async fn fetch_remote(&self, owner_id: &str, id: &EntityId) -> Result<T> {
        let documents = self
            .remote
            .query(&collection_path(owner_id, T::KIND), None)
            .await?;
        let document = documents
            .into_iter()
            .find(|document| document.id == id.value())
            .ok_or_else(|| Error::NotFound(format!("{} {id}", T::KIND)))?;
        decode_entity(document)
    }

    /// Remove a record.
    ///
    /// Offline deletes of records the remote store knows are queued for the
    /// next sync.
    pub async fn delete(&self, owner_id: &str, id: &EntityId, is_online: bool) -> Result<()> {
        if is_online && id.is_remote_shaped() {
            self.remote
                .delete(&collection_path(owner_id, T::KIND), id.value())
                .await?;
            tracing::debug!("Deleted {} {} remotely", T::KIND, id);
            if let Err(error) = self.remove_from_mirror(id).await {
                tracing::warn!("Failed to drop deleted {} from mirror: {}", T::KIND, error);
            }
            return Ok(());
        }

        let mut entities = self.cache.entities::<T>().await?;
        let before = entities.len();
        entities.retain(|entity| entity.id() != id);
        let removed = entities.len() != before;

        if !removed && !id.is_remote_shaped() {
            return Err(Error::NotFound(format!("{} {id}", T::KIND)));
        }
        if removed {
            self.cache.set_entities(&entities).await?;
        }
        if id.is_remote_shaped() {
            self.cache.add_pending_delete(T::KIND, owner_id, id).await?;
            tracing::info!("Queued remote delete of {} {}", T::KIND, id);
        }
        Ok(())
    }

    /// Records of one owner, optionally restricted to a parent.
    ///
    /// Online listings merge the remote records with local changes that have
    /// not been pushed; remote failures and empty answers fall back to the
    /// local cache.
    pub async fn list(
        &self,
        owner_id: &str,
        parent_id: Option<&EntityId>,
        is_online: bool,
    ) -> Result<Vec<T>> {
        if !is_online {
            return self.list_local(owner_id, parent_id).await;
        }

        match self.list_remote(owner_id, parent_id).await {
            Ok(remote) if !remote.is_empty() => {
                self.merge_remote(owner_id, parent_id, remote).await
            }
            Ok(_) => {
                tracing::debug!("Remote has no {} records; using local cache", T::KIND);
                self.list_local(owner_id, parent_id).await
            }
            Err(error) => {
                tracing::warn!("Remote list of {} failed, using local cache: {}", T::KIND, error);
                self.list_local(owner_id, parent_id).await
            }
        }
    }

    async fn list_local(&self, owner_id: &str, parent_id: Option<&EntityId>) -> Result<Vec<T>> {
        Ok(self
            .cache
            .entities::<T>()
            .await?
            .into_iter()
            .filter(|entity| in_scope(entity, owner_id, parent_id))
            .collect())
    }

    async fn list_remote(&self, owner_id: &str, parent_id: Option<&EntityId>) -> Result<Vec<T>> {
        let parent_value = parent_id.map(ToString::to_string);
        let filter = T::KIND
            .parent_field()
            .zip(parent_value.as_deref())
            .map(|(field, value)| FieldFilter { field, value });

        let documents = self
            .remote
            .query(&collection_path(owner_id, T::KIND), filter)
            .await?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id.clone();
                match decode_entity::<T>(document) {
                    Ok(entity) => Some(entity),
                    Err(error) => {
                        tracing::warn!("Skipping unreadable {} {}: {}", T::KIND, id, error);
                        None
                    }
                }
            })
            .collect())
    }

    async fn merge_remote(
        &self,
        owner_id: &str,
        parent_id: Option<&EntityId>,
        remote: Vec<T>,
    ) -> Result<Vec<T>> {
        let local = self.list_local(owner_id, parent_id).await?;
        let pending: HashSet<EntityId> = self
            .cache
            .pending_deletes(T::KIND, owner_id)
            .await?
            .into_iter()
            .collect();

        let remote: Vec<T> = remote
            .into_iter()
            .filter(|entity| !pending.contains(entity.id()))
            .collect();

        if let Err(error) = self.mirror_remote(owner_id, parent_id, &remote).await {
            tracing::warn!("Failed to mirror remote {} records: {}", T::KIND, error);
        }

        let mut merged: Vec<T> = remote
            .into_iter()
            .map(|entity| {
                local
                    .iter()
                    .find(|candidate| {
                        candidate.id() == entity.id()
                            && candidate.sync_state() == SyncState::RemoteDirty
                    })
                    .cloned()
                    .unwrap_or(entity)
            })
            .collect();
        merged.extend(
            local
                .into_iter()
                .filter(|entity| entity.sync_state() == SyncState::LocalUnsynced),
        );
        Ok(merged)
    }

    /// Refresh the mirrored copies within one listing scope.
    ///
    /// Local edits that were not pushed are kept; synced copies the remote no
    /// longer returns are dropped.
    async fn mirror_remote(
        &self,
        owner_id: &str,
        parent_id: Option<&EntityId>,
        remote: &[T],
    ) -> Result<()> {
        let mut entities = self.cache.entities::<T>().await?;
        let remote_ids: HashSet<&EntityId> = remote.iter().map(Entity::id).collect();
        entities.retain(|entity| {
            !(entity.sync_state() == SyncState::RemoteSynced
                && in_scope(entity, owner_id, parent_id)
                && !remote_ids.contains(entity.id()))
        });

        for record in remote {
            match entities.iter_mut().find(|entity| entity.id() == record.id()) {
                Some(entity) if entity.sync_state() == SyncState::RemoteDirty => {}
                Some(entity) => *entity = record.clone(),
                None => entities.push(record.clone()),
            }
        }
        self.cache.set_entities(&entities).await
    }

    async fn upsert_mirror(&self, record: T) -> Result<()> {
        let mut entities = self.cache.entities::<T>().await?;
        match entities.iter_mut().find(|entity| entity.id() == record.id()) {
            Some(entity) => *entity = record,
            None => entities.push(record),
        }
        self.cache.set_entities(&entities).await
    }

    async fn remove_from_mirror(&self, id: &EntityId) -> Result<()> {
        let mut entities = self.cache.entities::<T>().await?;
        let before = entities.len();
        entities.retain(|entity| entity.id() != id);
        if entities.len() == before {
            return Ok(());
        }
        self.cache.set_entities(&entities).await
    }
}

fn in_scope<T: Entity>(entity: &T, owner_id: &str, parent_id: Option<&EntityId>) -> bool {
    entity.meta().owner_id == owner_id
        && parent_id.is_none_or(|parent| entity.parent_id() == Some(parent))
}
