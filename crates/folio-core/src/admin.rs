//! Admin write path: login and publish against the content API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::ContentSnapshot;
use crate::util::normalize_text_option;
use crate::validation::{validate_snapshot, MAX_PAYLOAD_BYTES};

const ADMIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bearer token issued by `POST /portfolio/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AdminSession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct AdminClient {
    base_url: String,
    client: reqwest::Client,
}

impl AdminClient {
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_text_option(Some(api_base_url.into()))
            .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(ADMIN_REQUEST_TIMEOUT)
                .build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone())
    }

    /// Exchange admin credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "email and password must not be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/portfolio/login", self.base_url))
            .header("Accept", "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, 0));
        }

        let session = response
            .json::<AdminSession>()
            .await
            .map_err(|error| Error::MalformedResponse(error.to_string()))?;
        if session.token.trim().is_empty() {
            return Err(Error::MalformedResponse(
                "login response did not include a token".to_string(),
            ));
        }
        tracing::info!(expires_at = ?session.expires_at, "Admin session issued");
        Ok(session)
    }

    /// Replace the remote document with `snapshot`.
    ///
    /// Validates locally first; returns the snapshot as stored by the API.
    pub async fn publish(&self, snapshot: &ContentSnapshot, token: &str) -> Result<ContentSnapshot> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Unauthorized("no admin session".to_string()));
        }
        validate_snapshot(snapshot)?;
        let payload = serde_json::to_string(snapshot)?;
        let payload_len = payload.len();

        let response = self
            .client
            .post(format!("{}/portfolio", self.base_url))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, payload_len));
        }

        let document = response
            .json::<Value>()
            .await
            .map_err(|error| Error::MalformedResponse(error.to_string()))?;
        let stored = ContentSnapshot::from_document(document).ok_or_else(|| {
            Error::MalformedResponse("publish response is not a JSON object".to_string())
        })?;
        tracing::info!(bytes = payload_len, "Published portfolio document");
        Ok(stored)
    }
}

fn unreachable(error: reqwest::Error) -> Error {
    Error::NetworkUnreachable(error.to_string())
}

fn map_status(status: StatusCode, body: &str, payload_len: usize) -> Error {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::BAD_REQUEST => Error::ValidationRejected(message),
        StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge {
            limit: MAX_PAYLOAD_BYTES,
            actual: payload_len,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        _ => Error::NetworkUnreachable(message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_redacts_token() {
        let session = AdminSession {
            token: "secret".to_string(),
            expires_at: Some("2026-01-01T00:00:00Z".to_string()),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn statuses_map_to_typed_errors() {
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, r#"{"error":"name too long"}"#, 10),
            Error::ValidationRejected(message) if message == "name too long (400)"
        ));
        assert!(matches!(
            map_status(StatusCode::PAYLOAD_TOO_LARGE, "", 42),
            Error::PayloadTooLarge { actual: 42, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", 0),
            Error::Unauthorized(message) if message == "HTTP 401"
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "upstream down", 0),
            Error::NetworkUnreachable(_)
        ));
    }

    #[test]
    fn new_rejects_blank_base() {
        assert!(AdminClient::new("  ").is_err());
    }

    #[tokio::test]
    async fn publish_validates_before_sending() {
        let client = AdminClient::new("http://127.0.0.1:9/api").unwrap();
        let snapshot = ContentSnapshot::from_document(serde_json::json!({
            "personal": { "name": "<script>alert(1)</script>" }
        }))
        .unwrap();
        let err = client.publish(&snapshot, "token").await.unwrap_err();
        assert!(matches!(err, Error::ValidationRejected(_)));
    }

    #[tokio::test]
    async fn publish_without_token_is_unauthorized() {
        let client = AdminClient::new("http://127.0.0.1:9/api").unwrap();
        let err = client
            .publish(&ContentSnapshot::default(), " ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }
}
