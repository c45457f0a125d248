//! Currency conversion with a per-currency rate cache and a static fallback.

pub mod catalog;
mod rates;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use catalog::{format_amount, normalize_code, Currency, CURRENCIES, POPULAR_CODES};
pub use rates::{fallback_rate, parse_latest_rates, ExchangeRateApiClient, RateProvider};

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use crate::util::{round_money, unix_millis_now};

/// How long a cached rate table stays valid (24 hours).
pub const RATE_CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Cache key of the rates fetched for one source currency.
pub fn rate_cache_key(from: &str) -> String {
    format!("@currency_rates_{from}")
}

/// Where the rate behind a conversion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Same source and target currency
    Identity,
    Cache,
    Service,
    Fallback,
    /// No rate available, the amount was returned unconverted
    Passthrough,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identity => "identity",
            Self::Cache => "cache",
            Self::Service => "service",
            Self::Fallback => "fallback",
            Self::Passthrough => "unconverted",
        })
    }
}

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub source: RateSource,
}

impl Conversion {
    /// Whether a rate was actually applied.
    #[must_use]
    pub const fn is_converted(&self) -> bool {
        matches!(
            self.source,
            RateSource::Cache | RateSource::Service | RateSource::Fallback
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedRates {
    rates: HashMap<String, f64>,
    timestamp: i64,
}

/// Converts amounts, consulting cache, rate service and fallback table in turn.
pub struct CurrencyConverter<P, S> {
    provider: P,
    store: Arc<S>,
}

impl<P: RateProvider, S: KeyValueStore> CurrencyConverter<P, S> {
    pub const fn new(provider: P, store: Arc<S>) -> Self {
        Self { provider, store }
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Best-effort conversion.
    ///
    /// Returns `0.0` for empty codes or a non-finite amount, and the rounded
    /// original amount when no rate is available.
    pub async fn convert(&self, from: &str, to: &str, amount: f64) -> f64 {
        match self.try_convert(from, to, amount, true).await {
            Ok(conversion) => conversion.amount,
            Err(error) => {
                tracing::error!("Currency conversion rejected: {}", error);
                0.0
            }
        }
    }

    /// Conversion that reports its rate source.
    ///
    /// With `allow_network` unset only the cache and the fallback table are
    /// consulted.
    pub async fn try_convert(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        allow_network: bool,
    ) -> Result<Conversion> {
        let from = normalize_code(from);
        let to = normalize_code(to);
        if from.is_empty() || to.is_empty() {
            return Err(Error::Conversion("currency codes are required".to_string()));
        }
        if !amount.is_finite() {
            return Err(Error::Conversion(format!("invalid amount {amount}")));
        }

        if from == to {
            return Ok(converted(amount, 1.0, RateSource::Identity));
        }

        if let Some(rate) = self.cached_rate(&from, &to).await {
            return Ok(converted(amount, rate, RateSource::Cache));
        }

        if allow_network {
            match self.provider.latest_rates(&from).await {
                Ok(rates) => {
                    if let Some(rate) = rates.get(&to).copied().filter(|rate| rate.is_finite()) {
                        self.store_rate(&from, &to, rate).await;
                        return Ok(converted(amount, rate, RateSource::Service));
                    }
                    tracing::warn!("Rate service has no {} rate for {}", to, from);
                }
                Err(error) => tracing::warn!("Rate service failed for {}: {}", from, error),
            }
        }

        if let Some(rate) = fallback_rate(&from, &to) {
            tracing::warn!("Using fallback rate for {}_{}", from, to);
            return Ok(converted(amount, rate, RateSource::Fallback));
        }

        tracing::warn!("No conversion rate from {} to {}", from, to);
        Ok(converted(amount, 1.0, RateSource::Passthrough))
    }

    async fn cached_rate(&self, from: &str, to: &str) -> Option<f64> {
        let raw = match self.store.get_item(&rate_cache_key(from)).await {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read cached rates for {}: {}", from, error);
                return None;
            }
        };
        let cached: CachedRates = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(error) => {
                tracing::debug!("Ignoring unreadable cached rates for {}: {}", from, error);
                return None;
            }
        };

        if unix_millis_now() - cached.timestamp >= RATE_CACHE_TTL_MS {
            return None;
        }
        cached
            .rates
            .get(to)
            .copied()
            .filter(|rate| rate.is_finite() && rate.abs() > f64::EPSILON)
    }

    /// Overwrites the entry for `from` with the single fetched pair.
    async fn store_rate(&self, from: &str, to: &str, rate: f64) {
        let entry = CachedRates {
            rates: HashMap::from([(to.to_string(), rate)]),
            timestamp: unix_millis_now(),
        };
        let result = match serde_json::to_string(&entry) {
            Ok(payload) => self.store.set_item(&rate_cache_key(from), &payload).await,
            Err(error) => Err(error.into()),
        };
        if let Err(error) = result {
            tracing::warn!("Failed to cache rates for {}: {}", from, error);
        }
    }
}

fn converted(amount: f64, rate: f64, source: RateSource) -> Conversion {
    Conversion {
        amount: round_money(amount * rate),
        source,
    }
}
