use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use folio_core::cache::MessageKey;
use folio_core::db::{KeyValueStore, LibSqlKvStore};
use folio_core::sync::{ChangeSignal, CHANGE_SIGNAL_KEY};
use folio_core::{
    AdminSession, ContactMessage, ContentSnapshot, FreshnessMarker, LocalCacheStore, SnapshotSource,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use crate::auth::{is_expired, SessionStore};
use crate::cli::{CacheCommands, MessageCommands};
use crate::commands::cache::run_cache;
use crate::commands::common::{
    choose_cache_path, client_config_from, default_cache_path, format_marker_lines,
    format_message_lines, format_relative, format_summary_lines, normalize_message_body,
    open_cache, parse_message_key,
};
use crate::commands::messages::run_messages;
use crate::commands::publish::run_publish;
use crate::commands::sync::run_sync;
use crate::error::CliError;

fn cache_file(dir: &TempDir) -> PathBuf {
    dir.path().join("nested").join("cache.db")
}

fn message(name: &str, read: bool) -> ContactMessage {
    let mut message = ContactMessage::new(name, format!("{name}@example.com"), None, "hello");
    message.read = read;
    message
}

#[test]
fn default_cache_path_lives_under_folio_dir() {
    let path = default_cache_path();
    assert!(path.ends_with("folio/cache.db"));
}

#[test]
fn cache_path_prefers_flag_then_env() {
    let flag = PathBuf::from("/tmp/flag.db");
    assert_eq!(
        choose_cache_path(Some(flag.clone()), Some("/tmp/env.db".to_string())),
        flag
    );
    assert_eq!(
        choose_cache_path(None, Some(" /tmp/env.db ".to_string())),
        PathBuf::from("/tmp/env.db")
    );
    assert_eq!(choose_cache_path(None, Some("  ".to_string())), default_cache_path());
}

#[test]
fn client_config_override_replaces_env_api_base() {
    let mut values = HashMap::new();
    values.insert(
        "FOLIO_API_BASE_URL".to_string(),
        "https://env.example.com/api".to_string(),
    );
    values.insert("FOLIO_POLL_INTERVAL_SECS".to_string(), "30".to_string());

    let config =
        client_config_from(&values, Some("https://flag.example.com/api/".to_string())).unwrap();
    assert_eq!(config.api_base_url, "https://flag.example.com/api");
    assert_eq!(config.poll_interval, Duration::from_secs(30));

    let config = client_config_from(&values, None).unwrap();
    assert_eq!(config.api_base_url, "https://env.example.com/api");
}

#[test]
fn client_config_requires_api_base() {
    let err = client_config_from(&HashMap::new(), None).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}

#[test]
fn message_keys_parse_positions_and_ids() {
    assert_eq!(parse_message_key("#2").unwrap(), MessageKey::Position(2));
    assert_eq!(
        parse_message_key(" 1700000000000 ").unwrap(),
        MessageKey::Id("1700000000000".to_string())
    );
    assert!(parse_message_key("#0").is_err());
    assert!(parse_message_key("#two").is_err());
    assert!(parse_message_key("   ").is_err());
}

#[test]
fn message_body_is_joined_and_trimmed() {
    let parts = vec!["  hello".to_string(), "there  ".to_string()];
    assert_eq!(normalize_message_body(&parts), Some("hello there".to_string()));
    assert_eq!(normalize_message_body(&[" ".to_string()]), None);
}

#[test]
fn message_lines_keep_positions_when_filtering_unread() {
    let messages = vec![message("ada", true), message("grace", false)];

    let all = format_message_lines(&messages, false);
    assert_eq!(all.len(), 2);
    assert!(all[0].starts_with("  #1 ada <ada@example.com>"));

    let unread = format_message_lines(&messages, true);
    assert_eq!(unread.len(), 1);
    assert!(unread[0].starts_with("* #2 grace"));
}

#[test]
fn summary_lines_report_counts() {
    let snapshot = ContentSnapshot::from_document(json!({
        "personal": { "name": "Ada", "title": "Engineer" },
        "projects": [{ "title": "Engine" }, { "title": "Loom" }],
        "contactMessages": [{ "id": 1, "read": false }, { "id": 2, "read": true }],
        "settings": { "maintenance": { "enabled": true } }
    }))
    .unwrap();

    let lines = format_summary_lines(&snapshot);
    assert_eq!(lines[0], "Ada - Engineer");
    assert!(lines.contains(&"projects:       2".to_string()));
    assert!(lines.contains(&"messages:       2 (1 unread)".to_string()));
    assert!(lines.contains(&"maintenance:    on".to_string()));
}

#[test]
fn marker_lines_describe_missing_and_relative_times() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let markers = FreshnessMarker {
        last_update_timestamp: Some("2026-01-01T10:00:00Z".to_string()),
        update_version: None,
        cv_last_update: None,
    };

    let lines = format_marker_lines(&markers, now);
    assert_eq!(lines[0], "last update:    2026-01-01T10:00:00Z (2h ago)");
    assert_eq!(lines[1], "cv last update: never");
    assert_eq!(lines[2], "cache version:  never migrated");
}

#[test]
fn format_relative_units() {
    assert_eq!(format_relative(5), "just now");
    assert_eq!(format_relative(125), "2m ago");
    assert_eq!(format_relative(3 * 86_400), "3d ago");
}

#[test]
fn session_expiry_checks_rfc3339() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    assert!(is_expired("2025-12-31T23:59:59Z", now));
    assert!(!is_expired("2026-01-01T00:10:00Z", now));
    assert!(!is_expired("not a timestamp", now));
}

#[test]
fn session_store_round_trips_per_api_base() {
    let store = SessionStore::new("https://session-test.example.com/api/");
    let other = SessionStore::new("https://other-session-test.example.com/api");
    store.clear().unwrap();

    assert!(matches!(store.active_token(), Err(CliError::NotLoggedIn)));

    store
        .save(&AdminSession {
            token: "abc.def.ghi".to_string(),
            expires_at: Some("2999-01-01T00:00:00Z".to_string()),
        })
        .unwrap();
    assert_eq!(store.active_token().unwrap(), "abc.def.ghi");
    assert!(other.load().unwrap().is_none());

    store
        .save(&AdminSession {
            token: "stale".to_string(),
            expires_at: Some("2001-01-01T00:00:00Z".to_string()),
        })
        .unwrap();
    assert!(matches!(
        store.active_token(),
        Err(CliError::SessionExpired(_))
    ));

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn messages_commands_edit_the_cache() {
    let dir = TempDir::new().unwrap();
    let path = cache_file(&dir);

    for name in ["ada", "grace"] {
        run_messages(
            MessageCommands::Add {
                name: name.to_string(),
                email: format!("{name}@example.com"),
                subject: Some("  ".to_string()),
                message: vec!["hi".to_string()],
            },
            &path,
        )
        .await
        .unwrap();
    }

    run_messages(MessageCommands::Read { key: "#1".to_string() }, &path)
        .await
        .unwrap();
    run_messages(MessageCommands::Delete { key: "#2".to_string() }, &path)
        .await
        .unwrap();

    let cache = open_cache(&path).await.unwrap();
    let snapshot = cache.load_snapshot().await.unwrap().unwrap();
    let messages = snapshot.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].name.as_deref(), Some("ada"));
    assert!(messages[0].read);
    assert_eq!(messages[0].subject, None);

    let signal = stored_signal(&cache).await;
    assert_eq!(signal.map(|signal| signal.source), Some(SnapshotSource::Cache));
}

#[tokio::test(flavor = "current_thread")]
async fn messages_add_rejects_blank_body_and_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = cache_file(&dir);

    let err = run_messages(
        MessageCommands::Add {
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: None,
            message: vec!["   ".to_string()],
        },
        &path,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CliError::EmptyMessage));

    let err = run_messages(MessageCommands::Read { key: "#4".to_string() }, &path)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Core(folio_core::Error::NotFound(_))));
}

#[tokio::test(flavor = "current_thread")]
async fn cache_migrate_then_clear_keeps_version_tag() {
    let dir = TempDir::new().unwrap();
    let path = cache_file(&dir);

    {
        let cache = open_cache(&path).await.unwrap();
        cache
            .save_snapshot(&ContentSnapshot::from_document(json!({ "faq": [] })).unwrap())
            .await
            .unwrap();
        assert_eq!(cache.markers().await.unwrap().update_version, None);
    }

    run_cache(CacheCommands::Migrate, &path).await.unwrap();
    run_cache(CacheCommands::Clear, &path).await.unwrap();

    let cache = open_cache(&path).await.unwrap();
    let markers = cache.markers().await.unwrap();
    assert_eq!(markers.last_update_timestamp, None);
    assert_eq!(
        markers.update_version.as_deref(),
        Some(folio_core::cache::CURRENT_UPDATE_VERSION)
    );
    assert!(cache.load_snapshot().await.unwrap().is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn sync_against_unreachable_api_seeds_defaults() {
    let dir = TempDir::new().unwrap();
    let path = cache_file(&dir);
    let mut values = HashMap::new();
    values.insert(
        "FOLIO_API_BASE_URL".to_string(),
        "http://127.0.0.1:9/api".to_string(),
    );
    values.insert("FOLIO_FETCH_TIMEOUT_MS".to_string(), "1000".to_string());
    let config = client_config_from(&values, None).unwrap();

    run_sync(&config, &path, true).await.unwrap();

    let cache = open_cache(&path).await.unwrap();
    assert!(cache.load_snapshot().await.unwrap().is_some());
    assert!(cache.markers().await.unwrap().last_update_timestamp.is_some());
    let signal = stored_signal(&cache).await.unwrap();
    assert_eq!(signal.source, SnapshotSource::Defaults);
}

#[tokio::test(flavor = "current_thread")]
async fn publish_without_session_is_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("portfolio.json");
    std::fs::write(&document, json!({ "faq": [] }).to_string()).unwrap();

    let mut values = HashMap::new();
    values.insert(
        "FOLIO_API_BASE_URL".to_string(),
        "https://publish-test.example.com/api".to_string(),
    );
    let config = client_config_from(&values, None).unwrap();

    let err = run_publish(&config, &cache_file(&dir), &document)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NotLoggedIn));
}

async fn stored_signal(cache: &LocalCacheStore<LibSqlKvStore>) -> Option<ChangeSignal> {
    let raw = cache.store().get(CHANGE_SIGNAL_KEY).await.unwrap()?;
    Some(serde_json::from_str(&raw).unwrap())
}
