use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use folio_core::cache::MessageKey;
use folio_core::db::LibSqlKvStore;
use folio_core::{
    ChangeNotifier, ClientConfig, ContactMessage, ContentSnapshot, FreshnessMarker,
    LocalCacheStore, ReconcileEngine, ReconcileOutcome, RemoteFetcher,
};

use crate::error::CliError;

pub type CliEngine = ReconcileEngine<LibSqlKvStore, RemoteFetcher>;

const CACHE_PATH_VAR: &str = "FOLIO_CACHE_PATH";
const API_BASE_VAR: &str = "FOLIO_API_BASE_URL";

pub fn default_cache_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("folio");
    path.push("cache.db");
    path
}

/// Flag, then `FOLIO_CACHE_PATH`, then the platform data directory.
pub fn resolve_cache_path(cli_cache_path: Option<PathBuf>) -> PathBuf {
    choose_cache_path(cli_cache_path, env::var(CACHE_PATH_VAR).ok())
}

pub fn choose_cache_path(cli_cache_path: Option<PathBuf>, env_cache_path: Option<String>) -> PathBuf {
    cli_cache_path
        .or_else(|| {
            env_cache_path
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(default_cache_path)
}

/// Client config from the environment, with the API base optionally overridden.
pub fn load_client_config(api_base_override: Option<String>) -> Result<ClientConfig, CliError> {
    let values: HashMap<String, String> = env::vars().collect();
    client_config_from(&values, api_base_override)
}

pub fn client_config_from(
    values: &HashMap<String, String>,
    api_base_override: Option<String>,
) -> Result<ClientConfig, CliError> {
    let config = ClientConfig::from_lookup(|name| {
        if name == API_BASE_VAR {
            if let Some(value) = api_base_override.clone() {
                return Some(value);
            }
        }
        values.get(name).cloned()
    })?;
    Ok(config)
}

pub async fn open_cache(path: &Path) -> Result<LocalCacheStore<LibSqlKvStore>, CliError> {
    Ok(LocalCacheStore::new(LibSqlKvStore::open_path(path).await?))
}

/// Open the cache and run any pending one-time migration.
pub async fn open_migrated_cache(path: &Path) -> Result<LocalCacheStore<LibSqlKvStore>, CliError> {
    let cache = open_cache(path).await?;
    cache.migrate().await?;
    Ok(cache)
}

pub async fn build_engine(config: &ClientConfig, cache_path: &Path) -> Result<CliEngine, CliError> {
    let cache = open_migrated_cache(cache_path).await?;
    let notifier = ChangeNotifier::new(cache.store().clone());
    let fetcher = RemoteFetcher::from_config(config)?;
    Ok(ReconcileEngine::new(cache, fetcher, notifier).with_dev_mode(config.dev_mode))
}

/// `#N` addresses the N-th message; anything else is an id.
pub fn parse_message_key(raw: &str) -> Result<MessageKey, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidMessageKey(raw.to_string()));
    }
    match trimmed.strip_prefix('#') {
        Some(position) => position
            .parse::<usize>()
            .ok()
            .filter(|position| *position > 0)
            .map(MessageKey::Position)
            .ok_or_else(|| CliError::InvalidMessageKey(raw.to_string())),
        None => Ok(MessageKey::Id(trimmed.to_string())),
    }
}

pub fn normalize_message_body(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn format_message_lines(messages: &[ContactMessage], unread_only: bool) -> Vec<String> {
    messages
        .iter()
        .enumerate()
        .filter(|(_, message)| !unread_only || !message.read)
        .map(|(index, message)| {
            let marker = if message.read { ' ' } else { '*' };
            let sender = message.name.as_deref().unwrap_or("(anonymous)");
            let email = message.email.as_deref().unwrap_or("-");
            let subject = message.subject.as_deref().unwrap_or("(no subject)");
            let id = message.id_text().unwrap_or_else(|| "-".to_string());
            format!(
                "{marker} #{position} {sender} <{email}> {subject}  [{id}]",
                position = index + 1
            )
        })
        .collect()
}

pub fn format_summary_lines(snapshot: &ContentSnapshot) -> Vec<String> {
    let personal = snapshot.personal.as_ref();
    let name = personal.and_then(|personal| personal.name.as_deref()).unwrap_or("(unnamed)");
    let title = personal.and_then(|personal| personal.title.as_deref()).unwrap_or("-");
    let unread = snapshot
        .messages()
        .iter()
        .filter(|message| !message.read)
        .count();

    vec![
        format!("{name} - {title}"),
        format!("projects:       {}", len_of(snapshot.projects.as_ref())),
        format!("skills:         {}", len_of(snapshot.skills.as_ref())),
        format!("timeline:       {}", len_of(snapshot.timeline.as_ref())),
        format!("services:       {}", len_of(snapshot.services.as_ref())),
        format!("certifications: {}", len_of(snapshot.certifications.as_ref())),
        format!("faq:            {}", len_of(snapshot.faq.as_ref())),
        format!("messages:       {} ({unread} unread)", snapshot.message_count()),
        format!("cv:             {}", yes_no(snapshot.has_cv_reference())),
        format!("maintenance:    {}", on_off(snapshot.maintenance_enabled())),
    ]
}

pub fn format_marker_lines(markers: &FreshnessMarker, now: DateTime<Utc>) -> Vec<String> {
    vec![
        format!(
            "last update:    {}",
            describe_timestamp(markers.last_update_timestamp.as_deref(), now)
        ),
        format!(
            "cv last update: {}",
            describe_timestamp(markers.cv_last_update.as_deref(), now)
        ),
        format!(
            "cache version:  {}",
            markers.update_version.as_deref().unwrap_or("never migrated")
        ),
    ]
}

pub fn format_outcome_line(outcome: &ReconcileOutcome) -> String {
    format!(
        "source={} changed={} persisted={}",
        outcome.source, outcome.changed, outcome.persisted
    )
}

fn describe_timestamp(value: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(value) = value else {
        return "never".to_string();
    };
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| value.to_string(),
        |parsed| {
            let ago = now.signed_duration_since(parsed.with_timezone(&Utc));
            format!("{value} ({})", format_relative(ago.num_seconds()))
        },
    )
}

pub fn format_relative(seconds: i64) -> String {
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;

    if seconds < minute {
        "just now".to_string()
    } else if seconds < hour {
        format!("{}m ago", seconds / minute)
    } else if seconds < day {
        format!("{}h ago", seconds / hour)
    } else {
        format!("{}d ago", seconds / day)
    }
}

fn len_of<T>(items: Option<&Vec<T>>) -> usize {
    items.map_or(0, Vec::len)
}

const fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

const fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
