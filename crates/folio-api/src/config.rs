use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use folio_core::validation::MAX_PAYLOAD_BYTES;
use thiserror::Error;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub admin_email: String,
    pub admin_password: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub max_payload_bytes: usize,
    pub rate_limit_window: Duration,
    pub login_rate_limit_per_window: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "login_rate_limit_per_window",
                &self.login_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "FOLIO_API_BIND_ADDR", "127.0.0.1:8080");
        let db_path = PathBuf::from(value_or_default(&lookup, "FOLIO_DB_PATH", "folio.db"));

        let admin_email = required_trimmed(&lookup, "FOLIO_ADMIN_EMAIL")?.to_lowercase();
        if !admin_email.contains('@') {
            return Err(ConfigError::Invalid(
                "FOLIO_ADMIN_EMAIL must be an email address".to_string(),
            ));
        }
        let admin_password = required_trimmed(&lookup, "FOLIO_ADMIN_PASSWORD")?;

        let jwt_secret = required_trimmed(&lookup, "FOLIO_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "FOLIO_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters"
            )));
        }

        let token_ttl_secs =
            parse_in_range::<u64>(&lookup, "FOLIO_TOKEN_TTL_SECS", "86400", 300, 604_800)?;
        let auth_clock_skew_secs =
            parse_in_range::<u64>(&lookup, "AUTH_CLOCK_SKEW_SECS", "60", 0, 300)?;
        let default_payload = MAX_PAYLOAD_BYTES.to_string();
        let max_payload_bytes = parse_in_range::<usize>(
            &lookup,
            "FOLIO_MAX_PAYLOAD_BYTES",
            &default_payload,
            1_024,
            MAX_PAYLOAD_BYTES,
        )?;
        let rate_limit_window_secs =
            parse_in_range::<u64>(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10, 3_600)?;
        let login_rate_limit_per_window =
            parse_in_range::<u32>(&lookup, "LOGIN_RATE_LIMIT_PER_WINDOW", "10", 1, 1_000)?;

        Ok(Self {
            bind_addr,
            db_path,
            admin_email,
            admin_password,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            max_payload_bytes,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            login_rate_limit_per_window,
        })
    }
}

fn parse_in_range<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + fmt::Display + Copy,
{
    let value = value_or_default(lookup, name, default)
        .parse::<T>()
        .map_err(|_| {
            ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]"))
        })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    folio_core::util::normalize_text_option(lookup(name))
}
