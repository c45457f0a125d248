//! Batch reconciliation of queued local changes into the remote store.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::models::{Category, Entity, EntityId, EntityKind, Expense, IdRemap, SyncState, Trip};
use crate::remote::{
    collection_path, decode_entity, encode_entity, BatchOp, Document, RemoteStore,
};
use crate::storage::{KeyValueStore, LocalCache};
use crate::util::unix_millis_now;

/// Step of a per-kind sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Fetch,
    Create,
    Delete,
    Update,
    Persist,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Persist => "persist",
        };
        f.write_str(label)
    }
}

/// A phase that did not complete; its records are retried on the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseFailure {
    pub phase: SyncPhase,
    pub message: String,
}

/// Outcome of syncing one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    pub kind: EntityKind,
    /// Records inserted remotely
    pub created: usize,
    /// Records found remotely by content and given their remote id
    pub adopted: usize,
    /// Records held back because a parent has no remote id yet
    pub deferred: usize,
    pub deleted: usize,
    pub updated: usize,
    /// Edited records whose remote document is gone; dropped locally
    pub orphaned: usize,
    pub failures: Vec<PhaseFailure>,
}

impl KindReport {
    const fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            created: 0,
            adopted: 0,
            deferred: 0,
            deleted: 0,
            updated: 0,
            orphaned: 0,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, phase: SyncPhase, error: &Error) {
        tracing::error!("Sync {} phase for {} failed: {}", phase, self.kind, error);
        self.failures.push(PhaseFailure {
            phase,
            message: error.to_string(),
        });
    }

    const fn pushed(&self) -> usize {
        self.created + self.adopted + self.deleted + self.updated
    }
}

/// Outcome of a full sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub kinds: Vec<KindReport>,
}

impl SyncReport {
    /// Whether every phase of every kind completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.kinds.iter().all(|kind| kind.failures.is_empty())
    }

    /// Number of records whose remote state changed in this run.
    #[must_use]
    pub fn pushed(&self) -> usize {
        self.kinds.iter().map(KindReport::pushed).sum()
    }

    #[must_use]
    pub fn deferred(&self) -> usize {
        self.kinds.iter().map(|kind| kind.deferred).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (EntityKind, &PhaseFailure)> {
        self.kinds
            .iter()
            .flat_map(|kind| kind.failures.iter().map(move |failure| (kind.kind, failure)))
    }

    #[must_use]
    pub fn kind(&self, kind: EntityKind) -> Option<&KindReport> {
        self.kinds.iter().find(|report| report.kind == kind)
    }
}

/// Pushes local creates, deletes and updates to the remote store.
///
/// One reconciler is shared by every manager of a session so that only one
/// run per user can be in flight.
pub struct SyncReconciler<R, S> {
    remote: Arc<R>,
    cache: LocalCache<S>,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases the per-user in-flight slot on drop.
struct InFlightUser<'a> {
    users: &'a Mutex<HashSet<String>>,
    owner_id: String,
}

impl Drop for InFlightUser<'_> {
    fn drop(&mut self) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner_id);
    }
}

impl<R: RemoteStore, S: KeyValueStore> SyncReconciler<R, S> {
    pub fn new(remote: Arc<R>, cache: LocalCache<S>) -> Self {
        Self {
            remote,
            cache,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, owner_id: &str) -> Result<InFlightUser<'_>> {
        let mut users = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !users.insert(owner_id.to_string()) {
            return Err(Error::SyncInProgress(owner_id.to_string()));
        }
        Ok(InFlightUser {
            users: &self.in_flight,
            owner_id: owner_id.to_string(),
        })
    }

    /// Sync every kind, parents before children.
    pub async fn sync_all(&self, owner_id: &str) -> Result<SyncReport> {
        let _guard = self.begin(owner_id)?;
        tracing::info!("Starting sync for user {}", owner_id);

        let mut remap = match self.cache.id_remap().await {
            Ok(remap) => remap,
            Err(error) => {
                tracing::warn!("Ignoring unreadable id remap: {}", error);
                IdRemap::new()
            }
        };

        let mut report = SyncReport::default();
        for kind in EntityKind::SYNC_ORDER {
            let kind_report = match kind {
                EntityKind::Trip => self.sync_kind::<Trip>(owner_id, &mut remap).await,
                EntityKind::Category => self.sync_kind::<Category>(owner_id, &mut remap).await,
                EntityKind::Expense => self.sync_kind::<Expense>(owner_id, &mut remap).await,
            };
            report.kinds.push(kind_report);
        }

        if report.is_complete() {
            tracing::info!("Sync finished: {} records pushed", report.pushed());
            if report.deferred() == 0 {
                match self.cache.prune_id_remap().await {
                    Ok(0) => {}
                    Ok(pruned) => tracing::debug!("Pruned {} stale id remap entries", pruned),
                    Err(error) => tracing::warn!("Failed to prune id remap: {}", error),
                }
            }
        } else {
            tracing::warn!(
                "Sync finished with {} failed phases",
                report.failures().count()
            );
        }
        Ok(report)
    }

    /// One pass over a single kind: creates, then deletes, then updates.
    pub async fn sync_kind<T: Entity>(&self, owner_id: &str, remap: &mut IdRemap) -> KindReport {
        let mut report = KindReport::new(T::KIND);
        let collection = collection_path(owner_id, T::KIND);

        let (local, remote) = tokio::join!(
            self.cache.entities::<T>(),
            self.remote.query(&collection, None)
        );
        let mut local = match local {
            Ok(local) => local,
            Err(error) => {
                report.fail(SyncPhase::Fetch, &error);
                return report;
            }
        };
        let remote = match remote {
            Ok(remote) => remote,
            Err(error) => {
                report.fail(SyncPhase::Fetch, &error);
                return report;
            }
        };

        let remote_ids: HashSet<String> =
            remote.iter().map(|document| document.id.clone()).collect();
        let mut changed = apply_remap(&mut local, owner_id, remap);

        changed |= self
            .push_creates(owner_id, &collection, &mut local, remote, remap, &mut report)
            .await;
        self.push_deletes(owner_id, &collection, &mut report).await;
        changed |= drop_orphans(&mut local, owner_id, &remote_ids, &mut report);
        changed |= self
            .push_updates(owner_id, &collection, &mut local, &mut report)
            .await;

        if changed {
            if let Err(error) = self.cache.set_entities(&local).await {
                report.fail(SyncPhase::Persist, &error);
            }
        }
        tracing::debug!(
            "Synced {}: {} created, {} adopted, {} deferred, {} deleted, {} updated, {} orphaned",
            T::KIND,
            report.created,
            report.adopted,
            report.deferred,
            report.deleted,
            report.updated,
            report.orphaned
        );
        report
    }

    async fn push_creates<T: Entity>(
        &self,
        owner_id: &str,
        collection: &str,
        local: &mut [T],
        remote: Vec<Document>,
        remap: &mut IdRemap,
        report: &mut KindReport,
    ) -> bool {
        let remote_keys: HashMap<String, EntityId> = remote
            .into_iter()
            .filter_map(|document| decode_entity::<T>(document).ok())
            .map(|entity| (entity.content_key(), entity.id().clone()))
            .collect();

        let mut run_remap = IdRemap::new();
        let mut batch = Vec::new();
        let mut pending = Vec::new();

        for (index, entity) in local.iter_mut().enumerate() {
            if !is_owned_by(entity, owner_id) || entity.sync_state() != SyncState::LocalUnsynced {
                continue;
            }
            if let Some(remote_id) = remote_keys.get(&entity.content_key()) {
                run_remap.insert(entity.id().clone(), remote_id.clone());
                mark_synced(entity, remote_id.clone());
                report.adopted += 1;
                continue;
            }
            if entity.has_local_references() {
                report.deferred += 1;
                continue;
            }
            match encode_entity(&*entity, true) {
                Ok(data) => {
                    batch.push(BatchOp::Add {
                        collection: collection.to_string(),
                        data,
                    });
                    pending.push(index);
                }
                Err(error) => report.fail(SyncPhase::Create, &error),
            }
        }

        if !batch.is_empty() {
            match self.remote.commit(batch).await {
                Ok(ids) => {
                    for (index, id) in pending.into_iter().zip(ids) {
                        let remote_id = EntityId::remote(id);
                        run_remap.insert(local[index].id().clone(), remote_id.clone());
                        mark_synced(&mut local[index], remote_id);
                        report.created += 1;
                    }
                }
                Err(error) => report.fail(SyncPhase::Create, &error),
            }
        }

        if run_remap.is_empty() {
            return false;
        }
        if let Err(error) = self.cache.record_id_remap(&run_remap).await {
            report.fail(SyncPhase::Persist, &error);
        }
        remap.extend(run_remap);
        true
    }

    async fn push_deletes(&self, owner_id: &str, collection: &str, report: &mut KindReport) {
        let kind = report.kind;
        let pending = match self.cache.pending_deletes(kind, owner_id).await {
            Ok(pending) => pending,
            Err(error) => {
                report.fail(SyncPhase::Delete, &error);
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        let batch: Vec<BatchOp> = pending
            .iter()
            .filter(|id| id.is_remote_shaped())
            .map(|id| BatchOp::Delete {
                collection: collection.to_string(),
                id: id.value().to_string(),
            })
            .collect();
        let deleted = batch.len();

        if !batch.is_empty() {
            if let Err(error) = self.remote.commit(batch).await {
                report.fail(SyncPhase::Delete, &error);
                return;
            }
        }
        match self
            .cache
            .remove_pending_deletes(kind, owner_id, &pending)
            .await
        {
            Ok(()) => report.deleted += deleted,
            Err(error) => report.fail(SyncPhase::Delete, &error),
        }
    }

    async fn push_updates<T: Entity>(
        &self,
        owner_id: &str,
        collection: &str,
        local: &mut [T],
        report: &mut KindReport,
    ) -> bool {
        let mut batch = Vec::new();
        let mut pending = Vec::new();
        let updated_at = unix_millis_now();

        for (index, entity) in local.iter().enumerate() {
            if !is_owned_by(entity, owner_id)
                || entity.sync_state() != SyncState::RemoteDirty
                || !entity.id().is_remote_shaped()
            {
                continue;
            }
            match encode_entity(entity, false) {
                Ok(mut patch) => {
                    patch.insert("updated_at".to_string(), updated_at.into());
                    batch.push(BatchOp::Update {
                        collection: collection.to_string(),
                        id: entity.id().value().to_string(),
                        patch,
                    });
                    pending.push(index);
                }
                Err(error) => report.fail(SyncPhase::Update, &error),
            }
        }

        if batch.is_empty() {
            return false;
        }
        if let Err(error) = self.remote.commit(batch).await {
            report.fail(SyncPhase::Update, &error);
            return false;
        }

        for index in pending {
            let meta = local[index].meta_mut();
            meta.sync_state = SyncState::RemoteSynced;
            meta.updated_at = Some(updated_at);
            report.updated += 1;
        }
        true
    }
}

fn is_owned_by<T: Entity>(entity: &T, owner_id: &str) -> bool {
    entity.meta().owner_id == owner_id
}

/// Drop edited records whose remote document was deleted elsewhere, so they
/// stop failing the update batch of the whole kind.
fn drop_orphans<T: Entity>(
    local: &mut Vec<T>,
    owner_id: &str,
    remote_ids: &HashSet<String>,
    report: &mut KindReport,
) -> bool {
    let before = local.len();
    local.retain(|entity| {
        let orphaned = is_owned_by(entity, owner_id)
            && entity.sync_state() == SyncState::RemoteDirty
            && entity.id().is_remote_shaped()
            && !remote_ids.contains(entity.id().value());
        if orphaned {
            tracing::warn!(
                "Dropping edited {} {}: it no longer exists remotely",
                T::KIND,
                entity.id()
            );
        }
        !orphaned
    });
    report.orphaned += before - local.len();
    local.len() != before
}

/// Rewrite references to parents that were pushed under a new id.
///
/// Records the remote store already knows must push the new reference, so
/// they become dirty.
fn apply_remap<T: Entity>(local: &mut [T], owner_id: &str, remap: &IdRemap) -> bool {
    if remap.is_empty() {
        return false;
    }
    let mut changed = false;
    for entity in local.iter_mut().filter(|entity| is_owned_by(&**entity, owner_id)) {
        if entity.remap_references(remap) {
            let meta = entity.meta_mut();
            meta.sync_state = meta.sync_state.after_local_edit();
            changed = true;
        }
    }
    changed
}

fn mark_synced<T: Entity>(entity: &mut T, remote_id: EntityId) {
    let meta = entity.meta_mut();
    meta.id = remote_id;
    meta.sync_state = SyncState::RemoteSynced;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::MemoryRemoteStore;
    use crate::storage::MemoryKeyValueStore;

    const OWNER: &str = "traveler-1";

    fn setup() -> (
        Arc<MemoryRemoteStore>,
        LocalCache<MemoryKeyValueStore>,
        SyncReconciler<MemoryRemoteStore, MemoryKeyValueStore>,
    ) {
        let remote = Arc::new(MemoryRemoteStore::new());
        let cache = LocalCache::new(Arc::new(MemoryKeyValueStore::new()));
        let reconciler = SyncReconciler::new(Arc::clone(&remote), cache.clone());
        (remote, cache, reconciler)
    }

    fn owned<T: Entity>(mut entity: T) -> T {
        entity.meta_mut().owner_id = OWNER.to_string();
        entity
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_creates_are_pushed_and_marked() {
        let (remote, cache, reconciler) = setup();
        let trip = owned(Trip::new("Lisbon"));
        cache.set_entities(&[trip.clone()]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.kind(EntityKind::Trip).unwrap().created, 1);

        let synced = cache.entities::<Trip>().await.unwrap();
        assert_eq!(synced.len(), 1);
        assert!(synced[0].id().is_remote_shaped());
        assert_eq!(synced[0].sync_state(), SyncState::RemoteSynced);
        assert_eq!(synced[0].meta.created_at, trip.meta.created_at);

        let docs = remote.documents("users/traveler-1/travels");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, synced[0].id().value());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_existing_content_is_adopted_not_duplicated() {
        let (remote, cache, reconciler) = setup();
        let trip = owned(Trip::new("Lisbon"));
        let pushed = remote.seed(
            "users/traveler-1/travels",
            "RrRrRrRrRrRrRrRrRrRr",
            encode_entity(&trip, true).unwrap(),
        );
        cache.set_entities(&[trip]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        let trips = report.kind(EntityKind::Trip).unwrap();
        assert_eq!((trips.created, trips.adopted), (0, 1));
        assert_eq!(remote.documents("users/traveler-1/travels").len(), 1);
        assert_eq!(
            cache.entities::<Trip>().await.unwrap()[0].id().value(),
            pushed.id
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_children_follow_parents_pushed_in_same_run() {
        let (remote, cache, reconciler) = setup();
        let trip = owned(Trip::new("Lisbon"));
        let category = owned(Category::new(trip.id().clone(), "Food"));
        let expense = owned(
            Expense::new(category.id().clone(), "Coffee", 3.5, "EUR")
                .with_travel_id(trip.id().clone()),
        );
        cache.set_entities(&[trip]).await.unwrap();
        cache.set_entities(&[category]).await.unwrap();
        cache.set_entities(&[expense]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.pushed(), 3);
        assert_eq!(report.deferred(), 0);

        let trip = &cache.entities::<Trip>().await.unwrap()[0];
        let category = &cache.entities::<Category>().await.unwrap()[0];
        let expense = &cache.entities::<Expense>().await.unwrap()[0];
        assert_eq!(&category.travel_id, trip.id());
        assert_eq!(&expense.category_id, category.id());
        assert_eq!(expense.travel_id.as_ref(), Some(trip.id()));

        let docs = remote.documents("users/traveler-1/expenses");
        assert_eq!(docs[0].data["category_id"], category.id().value());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_orphaned_children_are_deferred() {
        let (remote, cache, reconciler) = setup();
        let category = owned(Category::new(EntityId::new_local(), "Food"));
        cache.set_entities(&[category]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.kind(EntityKind::Category).unwrap().deferred, 1);
        assert!(remote.documents("users/traveler-1/categories").is_empty());
        assert_eq!(
            cache.entities::<Category>().await.unwrap()[0].sync_state(),
            SyncState::LocalUnsynced
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deletes_clear_queue_only_after_commit() {
        let (remote, cache, reconciler) = setup();
        let doc = remote.seed(
            "users/traveler-1/travels",
            "DdDdDdDdDdDdDdDdDdDd",
            serde_json::Map::new(),
        );
        let id = EntityId::remote(doc.id);
        cache
            .add_pending_delete(EntityKind::Trip, OWNER, &id)
            .await
            .unwrap();
        cache
            .add_pending_delete(EntityKind::Trip, OWNER, &EntityId::remote("short"))
            .await
            .unwrap();

        remote.fail_next_commit();
        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(
            cache
                .pending_deletes(EntityKind::Trip, OWNER)
                .await
                .unwrap()
                .len(),
            2
        );

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.kind(EntityKind::Trip).unwrap().deleted, 1);
        assert!(cache
            .pending_deletes(EntityKind::Trip, OWNER)
            .await
            .unwrap()
            .is_empty());
        assert!(remote.documents("users/traveler-1/travels").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dirty_records_are_updated() {
        let (remote, cache, reconciler) = setup();
        let doc = remote.seed(
            "users/traveler-1/travels",
            "UuUuUuUuUuUuUuUuUuUu",
            encode_entity(&owned(Trip::new("Old")), true).unwrap(),
        );
        let mut trip: Trip = decode_entity(doc).unwrap();
        trip.name = "New".to_string();
        trip.meta.sync_state = SyncState::RemoteDirty;
        cache.set_entities(&[trip]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.kind(EntityKind::Trip).unwrap().updated, 1);
        assert_eq!(
            remote.documents("users/traveler-1/travels")[0].data["name"],
            "New"
        );
        assert_eq!(
            cache.entities::<Trip>().await.unwrap()[0].sync_state(),
            SyncState::RemoteSynced
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deletes_only_touch_the_syncing_owner() {
        let (remote, cache, reconciler) = setup();
        let doc = remote.seed(
            "users/alice/travels",
            "AlAlAlAlAlAlAlAlAlAl",
            serde_json::Map::new(),
        );
        let id = EntityId::remote(doc.id);
        cache
            .add_pending_delete(EntityKind::Trip, "alice", &id)
            .await
            .unwrap();

        let report = reconciler.sync_all("bob").await.unwrap();
        assert_eq!(report.kind(EntityKind::Trip).unwrap().deleted, 0);
        assert_eq!(
            cache
                .pending_deletes(EntityKind::Trip, "alice")
                .await
                .unwrap(),
            vec![id]
        );

        let report = reconciler.sync_all("alice").await.unwrap();
        assert_eq!(report.kind(EntityKind::Trip).unwrap().deleted, 1);
        assert!(remote.documents("users/alice/travels").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_orphaned_edits_do_not_block_other_updates() {
        let (remote, cache, reconciler) = setup();
        let doc = remote.seed(
            "users/traveler-1/travels",
            "KkKkKkKkKkKkKkKkKkKk",
            encode_entity(&owned(Trip::new("Kept")), true).unwrap(),
        );
        let mut kept: Trip = decode_entity(doc).unwrap();
        kept.name = "Kept and edited".to_string();
        kept.meta.sync_state = SyncState::RemoteDirty;

        let mut orphan = owned(Trip::new("Deleted elsewhere"));
        orphan.meta.id = EntityId::remote("GgGgGgGgGgGgGgGgGgGg");
        orphan.meta.sync_state = SyncState::RemoteDirty;
        cache.set_entities(&[kept, orphan]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert!(report.is_complete());
        let trips = report.kind(EntityKind::Trip).unwrap();
        assert_eq!((trips.updated, trips.orphaned), (1, 1));
        assert_eq!(
            remote.documents("users/traveler-1/travels")[0].data["name"],
            "Kept and edited"
        );

        let cached = cache.entities::<Trip>().await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].sync_state(), SyncState::RemoteSynced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_sync_prunes_id_remap() {
        let (_, cache, reconciler) = setup();
        let trip = owned(Trip::new("Lisbon"));
        let category = owned(Category::new(trip.id().clone(), "Food"));
        let stranded = owned(Category::new(EntityId::new_local(), "Stranded"));
        cache.set_entities(&[trip]).await.unwrap();
        cache.set_entities(&[category, stranded.clone()]).await.unwrap();

        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.deferred(), 1);
        assert_eq!(cache.id_remap().await.unwrap().len(), 2);

        let remaining: Vec<Category> = cache
            .entities::<Category>()
            .await
            .unwrap()
            .into_iter()
            .filter(|category| category.id() != stranded.id())
            .collect();
        cache.set_entities(&remaining).await.unwrap();
        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.deferred(), 0);
        assert!(cache.id_remap().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_remote_reports_and_keeps_state() {
        let (remote, cache, reconciler) = setup();
        let trip = owned(Trip::new("Lisbon"));
        cache.set_entities(&[trip.clone()]).await.unwrap();

        remote.set_unreachable(true);
        let report = reconciler.sync_all(OWNER).await.unwrap();
        assert_eq!(report.failures().count(), 3);
        assert_eq!(cache.entities::<Trip>().await.unwrap(), vec![trip]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_sync_for_same_user_is_rejected() {
        let remote = Arc::new(
            MemoryRemoteStore::new().with_latency(std::time::Duration::from_millis(50)),
        );
        let cache = LocalCache::new(Arc::new(MemoryKeyValueStore::new()));
        let reconciler = SyncReconciler::new(remote, cache);

        let (first, second) =
            tokio::join!(reconciler.sync_all(OWNER), reconciler.sync_all(OWNER));
        let rejected = [&first, &second]
            .iter()
            .filter(|result| matches!(result, Err(Error::SyncInProgress(_))))
            .count();
        assert_eq!(rejected, 1);
        assert!(reconciler.sync_all(OWNER).await.is_ok());
    }
}
