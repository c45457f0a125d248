//! Exchange-rate providers.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url};

/// Source of live exchange rates.
#[allow(async_fn_in_trait)]
pub trait RateProvider {
    /// Rates from `base` to every currency the provider knows.
    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, f64>>;
}

/// Rates that only exist as a fixed table, one pair per entry.
const FALLBACK_RATES: &[(&str, &str, f64)] = &[
    ("COP", "BRL", 0.0012),
    ("BRL", "COP", 833.33),
    ("BRL", "USD", 0.2),
    ("USD", "BRL", 5.0),
];

/// Last-resort rate when neither the cache nor the service can answer.
#[must_use]
pub fn fallback_rate(from: &str, to: &str) -> Option<f64> {
    FALLBACK_RATES
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, rate)| *rate)
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

/// Client for the exchangerate-api.com v6 `latest` endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateApiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiClient {
    /// Builds a client with a per-request timeout.
    ///
    /// Without an API key every lookup fails, which sends callers to the
    /// fallback table.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !is_http_url(&base_url) {
            return Err(Error::Validation(format!(
                "rates URL '{base_url}' must include http:// or https://"
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RateProvider for ExchangeRateApiClient {
    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, f64>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::Remote(
                "exchange-rate API key is not configured".to_string(),
            ));
        };

        let url = format!("{}/v6/{api_key}/latest/{base}", self.base_url);
        tracing::debug!("Fetching exchange rates for {}", base);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "exchange-rate service returned HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let body = response.text().await?;
        parse_latest_rates(&body)
    }
}

/// Parse a `latest` response body into a rate table.
pub fn parse_latest_rates(body: &str) -> Result<HashMap<String, f64>> {
    let response: LatestRatesResponse = serde_json::from_str(body)
        .map_err(|error| Error::Remote(format!("malformed exchange-rate response: {error}")))?;

    if response.result != "success" {
        return Err(Error::Remote(format!(
            "exchange-rate service error: {}",
            response.error_type.as_deref().unwrap_or("unknown")
        )));
    }
    if response.conversion_rates.is_empty() {
        return Err(Error::Remote(
            "exchange-rate response has no rates".to_string(),
        ));
    }

    Ok(response.conversion_rates)
}
