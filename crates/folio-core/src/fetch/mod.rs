//! Remote content fetcher.
//!
//! One timed GET of the portfolio document, classified into a
//! [`FetchResult`]. Never returns an error and never retries; pacing belongs
//! to the poller.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::emptiness::is_empty;
use crate::error::Result;
use crate::models::ContentSnapshot;
use crate::util::compact_text;

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Document with real content.
    Success(ContentSnapshot),
    /// HTTP success, but the document classifies as empty.
    Empty,
    /// Transport error, timeout, or non-2xx status.
    Unreachable(String),
    /// Body is not a JSON object.
    MalformedResponse(String),
}

impl FetchResult {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Empty => "empty",
            Self::Unreachable(_) => "unreachable",
            Self::MalformedResponse(_) => "malformed",
        }
    }
}

/// Anything that can produce the canonical snapshot for the engine.
pub trait ContentSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = FetchResult> + Send;
}

/// HTTP fetcher bound to one endpoint and timeout.
#[derive(Clone)]
pub struct RemoteFetcher {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteFetcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.portfolio_endpoint(), config.fetch_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch and classify the document, bounded by the timeout.
    pub async fn fetch_snapshot(&self) -> FetchResult {
        match tokio::time::timeout(self.timeout, self.request()).await {
            Ok(result) => result,
            Err(_) => FetchResult::Unreachable(format!(
                "timed out after {} ms",
                self.timeout.as_millis()
            )),
        }
    }

    async fn request(&self) -> FetchResult {
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();
        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("t", cache_buster.as_str())])
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return FetchResult::Unreachable(error.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::Unreachable(format!("HTTP {}", status.as_u16()));
        }

        match response.text().await {
            Ok(body) => classify_body(&body),
            Err(error) => FetchResult::Unreachable(error.to_string()),
        }
    }
}

impl ContentSource for RemoteFetcher {
    async fn fetch(&self) -> FetchResult {
        self.fetch_snapshot().await
    }
}

/// One-shot fetch of `endpoint` with a hard `timeout`.
pub async fn fetch(endpoint: &str, timeout: Duration) -> FetchResult {
    match RemoteFetcher::new(endpoint, timeout) {
        Ok(fetcher) => fetcher.fetch_snapshot().await,
        Err(error) => FetchResult::Unreachable(error.to_string()),
    }
}

/// Classify a successful response body.
///
/// Public for testability; callers can exercise classification without
/// network access.
pub fn classify_body(body: &str) -> FetchResult {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(error) => {
            return FetchResult::MalformedResponse(format!(
                "invalid JSON ({error}): {}",
                compact_text(body)
            ))
        }
    };

    let Some(snapshot) = ContentSnapshot::from_document(value) else {
        return FetchResult::MalformedResponse("document is not a JSON object".to_string());
    };

    if is_empty(&snapshot) {
        FetchResult::Empty
    } else {
        FetchResult::Success(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success_strips_metadata() {
        let result = classify_body(r#"{"_id":"x","__v":2,"projects":[{"title":"A"}]}"#);
        let FetchResult::Success(snapshot) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(snapshot.projects.map(|projects| projects.len()), Some(1));
    }

    #[test]
    fn classify_empty_document() {
        assert_eq!(classify_body("{}"), FetchResult::Empty);
        assert_eq!(
            classify_body(r#"{"_id":"x","projects":[],"skills":[],"timeline":[]}"#),
            FetchResult::Empty
        );
    }

    #[test]
    fn classify_malformed_bodies() {
        assert!(matches!(
            classify_body("<html>oops</html>"),
            FetchResult::MalformedResponse(_)
        ));
        assert!(matches!(
            classify_body("[1,2,3]"),
            FetchResult::MalformedResponse(_)
        ));
    }

    #[test]
    fn classify_coerces_single_project_object() {
        let result = classify_body(r#"{"projects":{"title":"Solo"}}"#);
        let FetchResult::Success(snapshot) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(snapshot.projects.map(|projects| projects.len()), Some(1));
    }

    #[tokio::test]
    async fn unreachable_host_is_classified_not_raised() {
        // Port 9 (discard) on localhost is closed in test environments.
        let result = fetch("http://127.0.0.1:9/portfolio", Duration::from_millis(500)).await;
        assert!(matches!(result, FetchResult::Unreachable(_)));
    }
}
