//! Key-value blob stores backing the local cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::db::Database;
use crate::error::{Error, Result};

/// Namespaced string blobs, no transactions across keys.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Read the blob stored under `key`
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Drop `key` entirely
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-process store, used by tests and as a scratch cache.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise error propagation.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the raw stored blobs.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(format!("write to '{key}' rejected")));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// libSQL implementation of `KeyValueStore`, one row per key.
#[derive(Clone)]
pub struct LibSqlKeyValueStore {
    db: Arc<Database>,
}

impl LibSqlKeyValueStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for LibSqlKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}
