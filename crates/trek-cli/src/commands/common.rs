use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use trek_core::alerts::{Action, Locale, UserAlert};
use trek_core::auth::{AuthUser, PreferencesStore};
use trek_core::config::AppConfig;
use trek_core::currency::{CurrencyConverter, ExchangeRateApiClient};
use trek_core::db::Database;
use trek_core::remote::{BatchOp, Document, FieldFilter, Fields, LibSqlRemoteStore, RemoteStore};
use trek_core::services::{
    ConvertingSave, DirectSave, EntityManager, EntityStore, NetworkStatus, SyncReconciler,
};
use trek_core::storage::{LibSqlKeyValueStore, LocalCache};
use trek_core::{Entity, EntityId, EntityKind, Expense, SyncState};

use crate::error::CliError;

const DB_FILE_NAME: &str = "trek.db";

pub type Manager<T> = EntityManager<T, RemoteBackend, LibSqlKeyValueStore, DirectSave>;
pub type Converter = CurrencyConverter<ExchangeRateApiClient, LibSqlKeyValueStore>;
pub type ExpenseManager = EntityManager<
    Expense,
    RemoteBackend,
    LibSqlKeyValueStore,
    ConvertingSave<ExchangeRateApiClient, LibSqlKeyValueStore>,
>;

/// Remote document store, or its absence when running offline.
pub enum RemoteBackend {
    Connected(LibSqlRemoteStore),
    Disconnected,
}

impl RemoteBackend {
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    fn connected(&self) -> trek_core::Result<&LibSqlRemoteStore> {
        match self {
            Self::Connected(store) => Ok(store),
            Self::Disconnected => Err(trek_core::Error::Remote(
                "remote store is not connected".to_string(),
            )),
        }
    }
}

impl RemoteStore for RemoteBackend {
    async fn add(&self, collection: &str, data: Fields) -> trek_core::Result<Document> {
        self.connected()?.add(collection, data).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<FieldFilter<'_>>,
    ) -> trek_core::Result<Vec<Document>> {
        self.connected()?.query(collection, filter).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> trek_core::Result<()> {
        self.connected()?.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> trek_core::Result<()> {
        self.connected()?.delete(collection, id).await
    }

    async fn commit(&self, batch: Vec<BatchOp>) -> trek_core::Result<Vec<String>> {
        self.connected()?.commit(batch).await
    }
}

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub offline: bool,
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub locale: Locale,
    pub json: bool,
}

/// Everything a command needs for one invocation.
pub struct Session {
    pub user: AuthUser,
    pub locale: Locale,
    pub json: bool,
    config: AppConfig,
    kv: Arc<LibSqlKeyValueStore>,
    remote: Arc<RemoteBackend>,
    cache: LocalCache<LibSqlKeyValueStore>,
    reconciler: Arc<SyncReconciler<RemoteBackend, LibSqlKeyValueStore>>,
    network: NetworkStatus,
}

impl Session {
    pub async fn open(options: SessionOptions, config: AppConfig) -> Result<Self, CliError> {
        let user_id = resolve_user_id(options.user, config.user_id.clone())?;
        let user = AuthUser::new(user_id, None)?;

        let data_dir = resolve_data_dir(options.data_dir, config.data_dir.clone())?;
        std::fs::create_dir_all(&data_dir)?;
        let local = Database::open(data_dir.join(DB_FILE_NAME)).await?;
        let kv = Arc::new(LibSqlKeyValueStore::new(Arc::new(local)));

        let remote = if options.offline {
            tracing::info!("Offline mode requested; changes are queued locally");
            RemoteBackend::Disconnected
        } else {
            connect_remote(&config).await
        };
        let network = NetworkStatus::new(remote.is_connected());
        let remote = Arc::new(remote);
        let cache = LocalCache::new(Arc::clone(&kv));

        Ok(Self {
            user,
            locale: options.locale,
            json: options.json,
            config,
            reconciler: Arc::new(SyncReconciler::new(Arc::clone(&remote), cache.clone())),
            kv,
            remote,
            cache,
            network,
        })
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    pub fn store<T: Entity>(&self) -> EntityStore<T, RemoteBackend, LibSqlKeyValueStore> {
        EntityStore::new(Arc::clone(&self.remote), self.cache.clone())
    }

    pub fn manager<T: Entity>(&self) -> Manager<T> {
        EntityManager::new(
            self.user.clone(),
            self.store(),
            Arc::clone(&self.reconciler),
            self.network.subscribe(),
            DirectSave,
        )
    }

    /// Expense manager converting new expenses to the user's base currency.
    pub async fn expense_manager(&self) -> Result<ExpenseManager, CliError> {
        let base_currency = self.base_currency().await?;
        Ok(EntityManager::new(
            self.user.clone(),
            self.store(),
            Arc::clone(&self.reconciler),
            self.network.subscribe(),
            ConvertingSave::new(Arc::new(self.converter()?), &base_currency),
        ))
    }

    pub fn converter(&self) -> Result<Converter, CliError> {
        let client = ExchangeRateApiClient::new(
            self.config.rates_url.clone(),
            self.config.rates_api_key.clone(),
            self.config.rates_timeout,
        )?;
        Ok(CurrencyConverter::new(client, Arc::clone(&self.kv)))
    }

    pub fn preferences(&self) -> PreferencesStore<LibSqlKeyValueStore> {
        PreferencesStore::new(Arc::clone(&self.kv))
    }

    pub async fn base_currency(&self) -> Result<String, CliError> {
        Ok(self.preferences().base_currency(&self.user).await?)
    }

    /// Localized alert for a failed entity operation.
    pub fn alert(&self, action: Action, kind: EntityKind, error: &trek_core::Error) -> CliError {
        tracing::debug!("{} {:?} failed: {}", kind, action, error);
        CliError::Alert(UserAlert::from_error(action, kind, error, self.locale))
    }
}

async fn connect_remote(config: &AppConfig) -> RemoteBackend {
    if !config.remote.is_configured() {
        tracing::info!("Remote store not configured; working offline");
        return RemoteBackend::Disconnected;
    }

    match Database::open_remote(&config.remote).await {
        Ok(db) => RemoteBackend::Connected(LibSqlRemoteStore::new(db)),
        Err(error) => {
            tracing::warn!("Remote store unreachable, working offline: {}", error);
            RemoteBackend::Disconnected
        }
    }
}

pub fn resolve_user_id(
    cli_user: Option<String>,
    config_user: Option<String>,
) -> Result<String, CliError> {
    cli_user
        .and_then(|user| normalize_text(&user))
        .or(config_user)
        .ok_or(CliError::UserNotConfigured)
}

pub fn resolve_data_dir(
    cli_data_dir: Option<PathBuf>,
    config_data_dir: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    cli_data_dir
        .or(config_data_dir)
        .or_else(|| dirs::data_dir().map(|dir| dir.join("trek")))
        .ok_or(CliError::DataDirUnavailable)
}

pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Join free-form words from the command line into a single name.
pub fn join_words(words: &[String]) -> Result<String, CliError> {
    normalize_text(&words.join(" ")).ok_or(CliError::EmptyName)
}

pub fn parse_id(id: &str) -> Result<EntityId, CliError> {
    if id.trim().is_empty() {
        return Err(CliError::EmptyId);
    }
    Ok(id.parse()?)
}

pub const fn sync_marker(state: SyncState) -> &'static str {
    match state {
        SyncState::LocalUnsynced => "local",
        SyncState::RemoteDirty => "edited",
        SyncState::RemoteSynced => "synced",
    }
}

/// Time of the last change, falling back to creation.
pub fn last_touched<T: Entity>(entity: &T) -> i64 {
    entity.meta().updated_at.unwrap_or(entity.meta().created_at)
}

/// Print records one per line, or as a JSON array.
pub fn print_records<T: Entity>(
    records: &[T],
    as_json: bool,
    line: impl Fn(&T, i64) -> String,
) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No {} records found.", T::KIND);
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for record in records {
        println!("{}", line(record, now_ms));
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
