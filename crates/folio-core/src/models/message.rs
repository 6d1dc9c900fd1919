//! Contact message model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::lenient;
use super::snapshot::Extra;

/// A message submitted through the public contact form.
///
/// Messages are created locally and may not have reached the backend yet,
/// which is why reconciliation never lets a remote copy shrink the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    /// Identifier; legacy documents use numeric millisecond ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Submission time (RFC 3339).
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub read: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ContactMessage {
    /// Create an unread message stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Value::String(Uuid::now_v7().to_string())),
            name: Some(name.into()),
            email: Some(email.into()),
            subject,
            message: Some(message.into()),
            date: Some(crate::util::now_rfc3339()),
            read: false,
            extra: Extra::new(),
        }
    }

    /// Identifier rendered as text (numbers are stringified).
    pub fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Whether `key` names this message.
    pub fn matches_id(&self, key: &str) -> bool {
        self.id_text().is_some_and(|id| id == key.trim())
    }
}
