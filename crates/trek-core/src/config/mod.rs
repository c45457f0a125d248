//! Runtime configuration read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::RemoteConfig;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_USER_ID: &str = "TREK_USER_ID";
pub const ENV_DATA_DIR: &str = "TREK_DATA_DIR";
pub const ENV_REMOTE_URL: &str = "TREK_REMOTE_URL";
pub const ENV_REMOTE_AUTH_TOKEN: &str = "TREK_REMOTE_AUTH_TOKEN";
pub const ENV_RATES_URL: &str = "TREK_RATES_URL";
pub const ENV_RATES_API_KEY: &str = "TREK_RATES_API_KEY";
pub const ENV_RATES_TIMEOUT_SECS: &str = "TREK_RATES_TIMEOUT_SECS";

pub const DEFAULT_RATES_URL: &str = "https://v6.exchangerate-api.com";
pub const DEFAULT_RATES_TIMEOUT_SECS: u64 = 4;

/// Settings shared by every front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Owner of every record; front ends may override it per invocation
    pub user_id: Option<String>,
    /// Directory holding the local database
    pub data_dir: Option<PathBuf>,
    /// Remote document store; unset means the app only ever runs offline
    pub remote: RemoteConfig,
    pub rates_url: String,
    pub rates_api_key: Option<String>,
    pub rates_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            data_dir: None,
            remote: RemoteConfig::default(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            rates_api_key: None,
            rates_timeout: Duration::from_secs(DEFAULT_RATES_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }
}

/// Build the configuration from an arbitrary variable lookup.
pub fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let user_id = normalize_text_option(lookup(ENV_USER_ID));
    let data_dir = normalize_text_option(lookup(ENV_DATA_DIR)).map(PathBuf::from);
    let remote_url = normalize_text_option(lookup(ENV_REMOTE_URL));
    let remote_token = normalize_text_option(lookup(ENV_REMOTE_AUTH_TOKEN));

    let remote = match (remote_url, remote_token) {
        (None, None) => RemoteConfig::default(),
        (None, Some(_)) => {
            return Err(Error::Validation(format!(
                "{ENV_REMOTE_AUTH_TOKEN} is set but {ENV_REMOTE_URL} is missing"
            )));
        }
        (Some(url), auth_token) => {
            if !is_remote_url(&url) {
                return Err(Error::Validation(format!(
                    "{ENV_REMOTE_URL} must use libsql://, http:// or https://"
                )));
            }
            RemoteConfig {
                url: Some(url),
                auth_token,
            }
        }
    };

    let rates_url = match normalize_text_option(lookup(ENV_RATES_URL)) {
        Some(url) if is_http_url(&url) => url.trim_end_matches('/').to_string(),
        Some(_) => {
            return Err(Error::Validation(format!(
                "{ENV_RATES_URL} must include http:// or https://"
            )));
        }
        None => DEFAULT_RATES_URL.to_string(),
    };

    let rates_timeout = match normalize_text_option(lookup(ENV_RATES_TIMEOUT_SECS)) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(Error::Validation(format!(
                    "{ENV_RATES_TIMEOUT_SECS} must be a positive number of seconds"
                )));
            }
        },
        None => Duration::from_secs(DEFAULT_RATES_TIMEOUT_SECS),
    };

    Ok(AppConfig {
        user_id,
        data_dir,
        remote,
        rates_url,
        rates_api_key: normalize_text_option(lookup(ENV_RATES_API_KEY)),
        rates_timeout,
    })
}

fn is_remote_url(value: &str) -> bool {
    value.starts_with("libsql://") || is_http_url(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<AppConfig> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_defaults() {
        let config = parse_from_map(&HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn parse_config_reads_all_values() {
        let map = HashMap::from([
            (ENV_USER_ID, " traveler-1 "),
            (ENV_DATA_DIR, "/tmp/trek"),
            (ENV_REMOTE_URL, "libsql://trek.turso.io"),
            (ENV_REMOTE_AUTH_TOKEN, "token"),
            (ENV_RATES_URL, "https://rates.example.com/"),
            (ENV_RATES_API_KEY, "key"),
            (ENV_RATES_TIMEOUT_SECS, "10"),
        ]);

        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("traveler-1"));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/trek")));
        assert_eq!(
            config.remote,
            RemoteConfig::new("libsql://trek.turso.io", "token")
        );
        assert_eq!(config.rates_url, "https://rates.example.com");
        assert_eq!(config.rates_api_key.as_deref(), Some("key"));
        assert_eq!(config.rates_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_config_rejects_token_without_url() {
        let map = HashMap::from([(ENV_REMOTE_AUTH_TOKEN, "token")]);
        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::Validation(message) => assert!(message.contains(ENV_REMOTE_URL)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_rejects_bad_urls_and_timeouts() {
        let map = HashMap::from([(ENV_REMOTE_URL, "trek.turso.io")]);
        assert!(parse_from_map(&map).is_err());

        let map = HashMap::from([(ENV_RATES_URL, "rates.example.com")]);
        assert!(parse_from_map(&map).is_err());

        let map = HashMap::from([(ENV_RATES_TIMEOUT_SECS, "0")]);
        assert!(parse_from_map(&map).is_err());
    }
}
