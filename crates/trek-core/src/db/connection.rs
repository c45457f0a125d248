//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Configuration for a remote (Turso / libSQL server) database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for remote database
    pub auth_token: Option<String>,
}

impl RemoteConfig {
    /// Create a new remote configuration
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
        }
    }

    /// Check if the remote is configured
    pub const fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
    is_remote: bool,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::initialize(db, false).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::initialize(db, false).await
    }

    /// Open a connection to a remote libSQL server
    ///
    /// Every statement is a network round trip; callers treat failures as
    /// transient remote errors.
    pub async fn open_remote(config: &RemoteConfig) -> Result<Self> {
        let url = config
            .url
            .as_ref()
            .ok_or_else(|| Error::Database("Remote URL is required".into()))?;
        let token = config.auth_token.clone().unwrap_or_default();

        tracing::debug!("Connecting to remote database at {}", url);
        let db = Builder::new_remote(url.clone(), token).build().await?;
        Self::initialize(db, true).await
    }

    async fn initialize(db: LibSqlDatabase, is_remote: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            _db: db,
            conn,
            is_remote,
        };
        if !is_remote {
            database.configure().await?;
        }
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for local use
    async fn configure(&self) -> Result<()> {
        // Pragmas that in-memory databases reject are ignored
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Whether this connection talks to a remote server
    pub const fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_remote());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_runs_migrations_once() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("trek.db");

        {
            Database::open(&db_path).await.unwrap();
        }
        let db = Database::open(&db_path).await.unwrap();

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM schema_version", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let versions: i64 = row.get(0).unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_remote_config_new() {
        let config = RemoteConfig::new("libsql://trek.turso.io", "test-token");
        assert!(config.is_configured());
        assert_eq!(config.auth_token, Some("test-token".to_string()));
    }

    #[test]
    fn test_remote_config_default_not_configured() {
        assert!(!RemoteConfig::default().is_configured());
    }
}
