//! Snapshot validation shared by the API and the admin client.
//!
//! Checks payload size, field shapes, string lengths, sequence lengths, and a
//! denylist of script-like content. Inline `data:` blobs are exempt from
//! length limits and are removed before the denylist scan.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::ContentSnapshot;
use crate::util::is_inline_blob;

pub const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_SEQUENCE_LEN: usize = 200;
pub const MAX_GENERIC_LEN: usize = 2_000;

const SEQUENCE_FIELDS: &[&str] = &[
    "projects",
    "skills",
    "timeline",
    "services",
    "certifications",
    "contactMessages",
    "faq",
];
const RECORD_FIELDS: &[&str] = &["personal", "links", "about", "settings"];

/// One rule violation at a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.path, self.reason)
    }
}

/// Maximum length in characters for a string under `field`.
pub fn max_len_for(field: Option<&str>) -> usize {
    match field {
        Some("name") => 100,
        Some("title") => 150,
        Some("bio" | "description" | "message") => 5_000,
        _ => MAX_GENERIC_LEN,
    }
}

/// Validate a serialized payload, returning the decoded document.
pub fn validate_payload(raw: &str, limit: usize) -> Result<Value> {
    if raw.len() > limit {
        return Err(Error::PayloadTooLarge {
            limit,
            actual: raw.len(),
        });
    }
    let document: Value = serde_json::from_str(raw)
        .map_err(|error| Error::ValidationRejected(format!("invalid JSON: {error}")))?;
    reject_violations(validate_document(&document, raw))?;
    Ok(document)
}

/// Validate a typed snapshot before it is sent or stored.
pub fn validate_snapshot(snapshot: &ContentSnapshot) -> Result<()> {
    let raw = serde_json::to_string(snapshot)?;
    validate_payload(&raw, MAX_PAYLOAD_BYTES).map(|_| ())
}

/// Collect every violation in `document`. `raw` is the serialized form
/// scanned by the denylist.
pub fn validate_document(document: &Value, raw: &str) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(object) = document.as_object() else {
        violations.push(Violation {
            path: "$".to_string(),
            reason: "document must be a JSON object".to_string(),
        });
        return violations;
    };

    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        if SEQUENCE_FIELDS.contains(&key.as_str()) && !(value.is_array() || value.is_object()) {
            violations.push(Violation {
                path: key.clone(),
                reason: "expected a list".to_string(),
            });
            continue;
        }
        if RECORD_FIELDS.contains(&key.as_str()) && !value.is_object() {
            violations.push(Violation {
                path: key.clone(),
                reason: "expected an object".to_string(),
            });
            continue;
        }
        check_value(value, key, Some(key), &mut violations);
    }

    if contains_script_like(raw) {
        violations.push(Violation {
            path: "$".to_string(),
            reason: "script-like content is not allowed".to_string(),
        });
    }

    violations
}

/// Whether `text` matches the denylist once inline blobs are removed.
pub fn contains_script_like(text: &str) -> bool {
    let stripped = blob_pattern().replace_all(text, "");
    denylist_pattern().is_match(&stripped)
}

fn check_value(value: &Value, path: &str, field: Option<&str>, violations: &mut Vec<Violation>) {
    match value {
        Value::String(text) => {
            if is_inline_blob(text) {
                return;
            }
            let limit = max_len_for(field);
            let length = text.chars().count();
            if length > limit {
                violations.push(Violation {
                    path: path.to_string(),
                    reason: format!("exceeds {limit} characters ({length})"),
                });
            }
        }
        Value::Array(items) => {
            if items.len() > MAX_SEQUENCE_LEN {
                violations.push(Violation {
                    path: path.to_string(),
                    reason: format!("exceeds {MAX_SEQUENCE_LEN} entries ({})", items.len()),
                });
            }
            for (index, item) in items.iter().enumerate() {
                check_value(item, &format!("{path}[{index}]"), None, violations);
            }
        }
        Value::Object(fields) => {
            for (key, item) in fields {
                check_value(item, &format!("{path}.{key}"), Some(key), violations);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn reject_violations(violations: Vec<Violation>) -> Result<()> {
    if violations.is_empty() {
        return Ok(());
    }
    let joined = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::ValidationRejected(joined))
}

fn blob_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)data:[a-z0-9.+/-]*(;[a-z0-9=.+-]+)*;base64,[A-Za-z0-9+/=]+")
            .expect("Invalid regex")
    })
}

fn denylist_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<script|javascript:|\bon[a-z]+\s*=|<iframe|eval\s*\(|document\.cookie")
            .expect("Invalid regex")
    })
}
