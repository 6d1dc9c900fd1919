//! Shared utility functions used across multiple modules.

use sha2::{Digest, Sha256};

/// Scheme prefix marking inline binary-as-text data (`data:application/pdf;base64,...`).
pub const INLINE_BLOB_PREFIX: &str = "data:";

/// Trimmed text, or `None` when missing or blank.
///
/// Environment values and form fields both go through here, so `" "` and an
/// unset variable mean the same thing.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Whether an API base is an absolute `http(s)` URL. The scheme is matched
/// case-insensitively.
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Check if a string is an inline blob rather than a path or URL.
pub fn is_inline_blob(value: &str) -> bool {
    value
        .get(..INLINE_BLOB_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(INLINE_BLOB_PREFIX))
}

/// Stable hex SHA-256 of a blob, used to recognise blobs without storing them twice.
pub fn blob_digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Interpret common truthy spellings (`1`, `true`, `yes`, `on`).
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
