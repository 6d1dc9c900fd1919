//! Client configuration.
//!
//! Provides `ClientConfig`, read from the environment by the CLI and by any
//! embedding client, describing where the content API lives and how the
//! reconciliation loop is paced.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::util::{is_http_url, is_truthy, normalize_text_option};

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 4_500;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings for a content client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base without trailing slash, e.g. `https://api.example.com/api`.
    pub api_base_url: String,
    pub fetch_timeout: Duration,
    pub poll_interval: Duration,
    pub initial_delay: Duration,
    /// Explicit cache file; callers pick a platform default when unset.
    pub cache_path: Option<PathBuf>,
    /// Developer diagnostics: failures are logged at `warn` instead of `debug`.
    pub dev_mode: bool,
}

impl ClientConfig {
    /// Config with defaults for everything except the API base.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_api_base(api_base_url.into())?;
        let dev_mode = is_dev_host(&api_base_url);
        Ok(Self {
            api_base_url,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            cache_path: None,
            dev_mode,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("FOLIO_API_BASE_URL")
            .and_then(|value| normalize_text_option(Some(value)))
            .ok_or(ConfigError::MissingVar("FOLIO_API_BASE_URL"))?;
        let mut config = Self::new(api_base_url)?;

        if let Some(ms) = parse_in_range(&lookup, "FOLIO_FETCH_TIMEOUT_MS", 500..=30_000)? {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_in_range(&lookup, "FOLIO_POLL_INTERVAL_SECS", 1..=3_600)? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_in_range(&lookup, "FOLIO_INITIAL_DELAY_SECS", 0..=600)? {
            config.initial_delay = Duration::from_secs(secs);
        }

        config.cache_path =
            normalize_text_option(lookup("FOLIO_CACHE_PATH")).map(PathBuf::from);

        if let Some(flag) = normalize_text_option(lookup("FOLIO_DEV_MODE")) {
            config.dev_mode = is_truthy(&flag);
        }

        Ok(config)
    }

    /// Public read endpoint for the portfolio document.
    pub fn portfolio_endpoint(&self) -> String {
        format!("{}/portfolio", self.api_base_url)
    }
}

/// Whether the API host looks like a local development machine.
pub fn is_dev_host(api_base_url: &str) -> bool {
    let Ok(url) = url::Url::parse(api_base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0") || host.ends_with(".local")
}

fn normalize_api_base(raw: String) -> Result<String, ConfigError> {
    let base = normalize_text_option(Some(raw))
        .ok_or_else(|| ConfigError::Invalid("API base URL must not be empty".to_string()))?;
    if !is_http_url(&base) {
        return Err(ConfigError::Invalid(
            "FOLIO_API_BASE_URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(base.trim_end_matches('/').to_string())
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    range: std::ops::RangeInclusive<u64>,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = normalize_text_option(lookup(name)) else {
        return Ok(None);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(Some(value))
}
