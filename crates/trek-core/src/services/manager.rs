//! Facade combining an entity store, connectivity and sync for front ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use super::{EntityStore, SyncReconciler, SyncReport};
use crate::auth::AuthUser;
use crate::currency::{normalize_code, CurrencyConverter, RateProvider};
use crate::error::{Error, Result};
use crate::models::{Entity, EntityId, Expense};
use crate::remote::RemoteStore;
use crate::storage::KeyValueStore;

/// How a new record of one kind gets persisted.
#[allow(async_fn_in_trait)]
pub trait SaveStrategy<T: Entity> {
    async fn save<R: RemoteStore, S: KeyValueStore>(
        &self,
        store: &EntityStore<T, R, S>,
        owner_id: &str,
        entity: T,
        is_online: bool,
    ) -> Result<T>;
}

/// Saves records as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSave;

impl<T: Entity> SaveStrategy<T> for DirectSave {
    async fn save<R: RemoteStore, S: KeyValueStore>(
        &self,
        store: &EntityStore<T, R, S>,
        owner_id: &str,
        entity: T,
        is_online: bool,
    ) -> Result<T> {
        store.save(owner_id, entity, is_online).await
    }
}

/// Converts expenses to the user's base currency before saving.
///
/// When no real conversion is possible the expense is kept in its own
/// currency, saved locally, with a note in `conversion_error`.
pub struct ConvertingSave<P, K> {
    converter: Arc<CurrencyConverter<P, K>>,
    base_currency: String,
}

impl<P, K> ConvertingSave<P, K> {
    pub fn new(converter: Arc<CurrencyConverter<P, K>>, base_currency: &str) -> Self {
        Self {
            converter,
            base_currency: normalize_code(base_currency),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }
}

impl<P: RateProvider, K: KeyValueStore> SaveStrategy<Expense> for ConvertingSave<P, K> {
    async fn save<R: RemoteStore, S: KeyValueStore>(
        &self,
        store: &EntityStore<Expense, R, S>,
        owner_id: &str,
        mut expense: Expense,
        is_online: bool,
    ) -> Result<Expense> {
        expense.currency = normalize_code(&expense.currency);
        if expense.currency == self.base_currency {
            return store.save(owner_id, expense, is_online).await;
        }

        let outcome = self
            .converter
            .try_convert(
                &expense.currency,
                &self.base_currency,
                expense.amount,
                is_online,
            )
            .await;

        let note = match outcome {
            Ok(conversion)
                if conversion.is_converted() && conversion.amount.abs() > f64::EPSILON =>
            {
                expense.original_amount = Some(expense.amount);
                expense.original_currency = Some(expense.currency.clone());
                expense.amount = conversion.amount;
                expense.currency.clone_from(&self.base_currency);
                return store.save(owner_id, expense, is_online).await;
            }
            Ok(conversion) if conversion.is_converted() => format!(
                "Conversion from {} to {} produced zero",
                expense.currency, self.base_currency
            ),
            Ok(_) => format!(
                "No exchange rate from {} to {}",
                expense.currency, self.base_currency
            ),
            Err(error) => error.to_string(),
        };

        tracing::warn!("Saving expense unconverted: {}", note);
        expense.conversion_error = Some(note);
        store.save(owner_id, expense, false).await
    }
}

/// Resets the in-flight flag when a submission ends.
struct Submission<'a>(&'a AtomicBool);

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// UI-facing operations for one entity kind and one user.
pub struct EntityManager<T, R, S, V> {
    user: AuthUser,
    store: EntityStore<T, R, S>,
    reconciler: Arc<SyncReconciler<R, S>>,
    network: watch::Receiver<bool>,
    strategy: V,
    parent_id: Option<EntityId>,
    items: Mutex<Vec<T>>,
    submitting: AtomicBool,
}

impl<T, R, S, V> EntityManager<T, R, S, V>
where
    T: Entity,
    R: RemoteStore,
    S: KeyValueStore,
    V: SaveStrategy<T>,
{
    pub fn new(
        user: AuthUser,
        store: EntityStore<T, R, S>,
        reconciler: Arc<SyncReconciler<R, S>>,
        network: watch::Receiver<bool>,
        strategy: V,
    ) -> Self {
        Self {
            user,
            store,
            reconciler,
            network,
            strategy,
            parent_id: None,
            items: Mutex::new(Vec::new()),
            submitting: AtomicBool::new(false),
        }
    }

    /// Restrict listings to the children of one parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: EntityId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub const fn user(&self) -> &AuthUser {
        &self.user
    }

    /// Items from the last successful load.
    pub fn items(&self) -> Vec<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    fn is_online(&self) -> bool {
        *self.network.borrow()
    }

    fn begin(&self) -> Result<Submission<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::Busy)?;
        Ok(Submission(&self.submitting))
    }

    /// Fetch the current list and keep it as `items`.
    pub async fn load_data(&self) -> Result<Vec<T>> {
        let is_online = self.is_online();
        self.load(is_online).await
    }

    async fn load(&self, is_online: bool) -> Result<Vec<T>> {
        let items = self
            .store
            .list(&self.user.id, self.parent_id.as_ref(), is_online)
            .await?;
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(&items);
        Ok(items)
    }

    async fn reload(&self, is_online: bool) {
        if let Err(error) = self.load(is_online).await {
            tracing::warn!("Failed to reload {} list: {}", T::KIND, error);
        }
    }

    pub async fn handle_add(&self, entity: T) -> Result<T> {
        let _submission = self.begin()?;
        entity.validate_form()?;

        let is_online = self.is_online();
        let saved = self
            .strategy
            .save(&self.store, &self.user.id, entity, is_online)
            .await?;
        tracing::info!("Added {} {}", T::KIND, saved.id());
        self.reload(is_online).await;
        Ok(saved)
    }

    pub async fn handle_update(&self, id: &EntityId, patch: &T::Patch) -> Result<T> {
        let _submission = self.begin()?;
        if let Some(mut preview) = self.items().into_iter().find(|item| item.id() == id) {
            preview.apply_patch(patch);
            preview.validate_form()?;
        }

        let is_online = self.is_online();
        let updated = self
            .store
            .update(&self.user.id, id, patch, is_online)
            .await?;
        tracing::info!("Updated {} {}", T::KIND, id);
        self.reload(is_online).await;
        Ok(updated)
    }

    pub async fn handle_delete(&self, id: &EntityId) -> Result<()> {
        let _submission = self.begin()?;
        let is_online = self.is_online();
        self.store.delete(&self.user.id, id, is_online).await?;
        tracing::info!("Deleted {} {}", T::KIND, id);
        self.reload(is_online).await;
        Ok(())
    }

    /// Push every queued change of this user.
    pub async fn handle_sync(&self) -> Result<SyncReport> {
        let _submission = self.begin()?;
        if !self.is_online() {
            return Err(Error::Remote("cannot sync while offline".to_string()));
        }

        let report = self.reconciler.sync_all(&self.user.id).await?;
        self.reload(true).await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{SyncState, Trip, TripPatch};
    use crate::remote::MemoryRemoteStore;
    use crate::services::NetworkStatus;
    use crate::storage::{LocalCache, MemoryKeyValueStore};

    type Store<T> = EntityStore<T, MemoryRemoteStore, MemoryKeyValueStore>;

    struct FixedRates(HashMap<String, f64>);

    impl RateProvider for FixedRates {
        async fn latest_rates(&self, _base: &str) -> Result<HashMap<String, f64>> {
            Ok(self.0.clone())
        }
    }

    fn parts(
        latency: Option<Duration>,
    ) -> (
        Arc<MemoryRemoteStore>,
        Arc<MemoryKeyValueStore>,
        LocalCache<MemoryKeyValueStore>,
        Arc<SyncReconciler<MemoryRemoteStore, MemoryKeyValueStore>>,
    ) {
        let remote = MemoryRemoteStore::new();
        let remote = Arc::new(match latency {
            Some(latency) => remote.with_latency(latency),
            None => remote,
        });
        let kv = Arc::new(MemoryKeyValueStore::new());
        let cache = LocalCache::new(Arc::clone(&kv));
        let reconciler = Arc::new(SyncReconciler::new(Arc::clone(&remote), cache.clone()));
        (remote, kv, cache, reconciler)
    }

    fn user() -> AuthUser {
        AuthUser::new("traveler-1", None).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_validates_form_and_reloads() {
        let (remote, _, cache, reconciler) = parts(None);
        let network = NetworkStatus::new(true);
        let manager = EntityManager::new(
            user(),
            Store::<Trip>::new(Arc::clone(&remote), cache),
            reconciler,
            network.subscribe(),
            DirectSave,
        );

        assert!(matches!(
            manager.handle_add(Trip::new("")).await,
            Err(Error::Validation(_))
        ));
        assert!(!manager.is_submitting());

        let saved = manager.handle_add(Trip::new("Lisbon")).await.unwrap();
        assert_eq!(manager.items(), vec![saved]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_overlapping_submissions_are_rejected() {
        let (remote, _, cache, reconciler) = parts(Some(Duration::from_millis(50)));
        let network = NetworkStatus::new(true);
        let manager = EntityManager::new(
            user(),
            Store::<Trip>::new(Arc::clone(&remote), cache),
            reconciler,
            network.subscribe(),
            DirectSave,
        );

        let (first, second) = tokio::join!(
            manager.handle_add(Trip::new("Lisbon")),
            manager.handle_add(Trip::new("Lisbon"))
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::Busy)));
        assert_eq!(remote.documents("users/traveler-1/travels").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connectivity_is_sampled_per_call() {
        let (remote, _, cache, reconciler) = parts(None);
        let network = NetworkStatus::new(false);
        let manager = EntityManager::new(
            user(),
            Store::<Trip>::new(Arc::clone(&remote), cache),
            reconciler,
            network.subscribe(),
            DirectSave,
        );

        let offline = manager.handle_add(Trip::new("Draft")).await.unwrap();
        assert_eq!(offline.sync_state(), SyncState::LocalUnsynced);
        assert!(matches!(manager.handle_sync().await, Err(Error::Remote(_))));

        network.set_online(true);
        let report = manager.handle_sync().await.unwrap();
        assert_eq!(report.pushed(), 1);
        assert!(manager.items()[0].id().is_remote_shaped());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_runs_form_validation_on_known_items() {
        let (remote, _, cache, reconciler) = parts(None);
        let network = NetworkStatus::new(true);
        let manager = EntityManager::new(
            user(),
            Store::<Trip>::new(Arc::clone(&remote), cache),
            reconciler,
            network.subscribe(),
            DirectSave,
        );
        let saved = manager.handle_add(Trip::new("Lisbon")).await.unwrap();

        let blank = TripPatch {
            name: Some(" ".to_string()),
            color: None,
        };
        assert!(matches!(
            manager.handle_update(saved.id(), &blank).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(remote.call_counts().update, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_converting_save_records_original_amount() {
        let (remote, kv, cache, reconciler) = parts(None);
        let converter = Arc::new(CurrencyConverter::new(
            FixedRates(HashMap::from([("USD".to_string(), 1.1)])),
            Arc::clone(&kv),
        ));
        let network = NetworkStatus::new(true);
        let manager = EntityManager::new(
            user(),
            Store::<Expense>::new(Arc::clone(&remote), cache),
            reconciler,
            network.subscribe(),
            ConvertingSave::new(converter, "usd"),
        );

        let category = EntityId::remote("CcCcCcCcCcCcCcCcCcCc");
        let saved = manager
            .handle_add(Expense::new(category, "Coffee", 3.5, "eur"))
            .await
            .unwrap();
        assert_eq!(saved.amount, 3.85);
        assert_eq!(saved.currency, "USD");
        assert_eq!(saved.original_amount, Some(3.5));
        assert_eq!(saved.original_currency.as_deref(), Some("EUR"));
        assert_eq!(saved.conversion_error, None);
        assert_eq!(saved.sync_state(), SyncState::RemoteSynced);
    }
}
