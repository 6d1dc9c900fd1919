use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window limiter for login attempts, keyed by submitted email.
#[derive(Clone)]
pub struct LoginRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Default)]
struct RateLimitMetrics {
    login_allowed: AtomicU64,
    login_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub login_allowed: u64,
    pub login_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl LoginRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_window, config.login_rate_limit_per_window)
    }

    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, email: &str) -> Result<(), AppError> {
        let key = email.trim().to_lowercase();
        let now = Instant::now();
        let mut guard = self.state.lock().await;

        // Drop windows that expired so the map does not grow without bound.
        guard.retain(|_, entry| now.duration_since(entry.started_at) < self.window);

        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if entry.count >= self.limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.metrics.login_limited.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                endpoint = "login",
                client = email_fingerprint(email),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Too many login attempts",
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.metrics.login_allowed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            login_allowed: self.metrics.login_allowed.load(Ordering::Relaxed),
            login_limited: self.metrics.login_limited.load(Ordering::Relaxed),
        }
    }
}

pub fn email_fingerprint(email: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    email.trim().to_lowercase().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = LoginRateLimiter::new(Duration::from_secs(60), 2);

        limiter.check("admin@example.com").await.unwrap();
        limiter.check("ADMIN@example.com").await.unwrap();

        let err = limiter.check("admin@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, secs) if secs <= 60));

        limiter.check("someone@example.com").await.unwrap();

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.login_allowed, 3);
        assert_eq!(metrics.login_limited, 1);
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let limiter = LoginRateLimiter::new(Duration::from_millis(50), 1);
        limiter.check("admin@example.com").await.unwrap();
        assert!(limiter.check("admin@example.com").await.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        limiter.check("admin@example.com").await.unwrap();
    }
}
