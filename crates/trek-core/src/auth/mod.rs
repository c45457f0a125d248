//! Signed-in user identity and per-user preferences.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::currency::catalog;
use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use crate::util::normalize_text_option;

/// Base currency used until the user picks one.
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Result<Self> {
        let id = normalize_text_option(Some(id.into()))
            .ok_or_else(|| Error::Validation("user id must not be empty".to_string()))?;
        Ok(Self {
            id,
            email: normalize_text_option(email),
        })
    }
}

/// Key under which a user's base currency is stored.
pub fn base_currency_key(user_id: &str) -> String {
    format!("@user_currency_{user_id}")
}

/// Per-user settings persisted in the key-value store.
pub struct PreferencesStore<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> PreferencesStore<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The user's base currency, `USD` when unset or no longer supported.
    pub async fn base_currency(&self, user: &AuthUser) -> Result<String> {
        let stored = self.store.get_item(&base_currency_key(&user.id)).await?;
        match stored.as_deref().and_then(catalog::find) {
            Some(currency) => Ok(currency.code.to_string()),
            None => {
                if let Some(raw) = stored {
                    tracing::warn!("Ignoring unsupported base currency '{}'", raw);
                }
                Ok(DEFAULT_BASE_CURRENCY.to_string())
            }
        }
    }

    /// Store a new base currency, returning the normalized code.
    pub async fn set_base_currency(&self, user: &AuthUser, code: &str) -> Result<String> {
        let currency = catalog::find(code)
            .ok_or_else(|| Error::Validation(format!("unsupported currency '{}'", code.trim())))?;
        self.store
            .set_item(&base_currency_key(&user.id), currency.code)
            .await?;
        tracing::info!("Base currency set to {}", currency.code);
        Ok(currency.code.to_string())
    }
}
