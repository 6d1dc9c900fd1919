use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use folio_core::validation::validate_payload;
use folio_core::ContentSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AdminTokenAuthority, AuthenticatedAdmin, IssuedToken};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{email_fingerprint, LoginRateLimiter, RateLimitMetricsSnapshot};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    store: DocumentStore,
    authority: Arc<AdminTokenAuthority>,
    login_rate_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: DocumentStore) -> Self {
        Self {
            authority: Arc::new(AdminTokenAuthority::new(config.clone())),
            login_rate_limiter: Arc::new(LoginRateLimiter::from_config(config.as_ref())),
            store,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    // Bodies up to twice the limit reach `validate_payload`, which answers 413
    // with a JSON error body.
    let body_limit = state.config.max_payload_bytes.saturating_mul(2);

    let protected_routes = Router::new()
        .route("/portfolio", post(publish_portfolio))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/portfolio", get(get_portfolio))
        .route("/portfolio/login", post(login))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    revision: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        revision: state.store.revision().await?,
        rate_limit: state.login_rate_limiter.metrics_snapshot(),
    }))
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let admin = state.authority.verify(token)?;
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

async fn get_portfolio(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let body = match state.store.load().await? {
        Some(document) => document.to_wire()?,
        None => Value::Object(Map::new()),
    };
    Ok(Json(body))
}

async fn publish_portfolio(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    body: String,
) -> Result<Json<Value>, AppError> {
    let document = validate_payload(&body, state.config.max_payload_bytes)?;
    let snapshot = ContentSnapshot::from_document(document)
        .ok_or_else(|| AppError::bad_request("document must be a JSON object"))?;

    let stored = state.store.save(&snapshot).await?;
    tracing::info!(
        endpoint = "portfolio_publish",
        session = %admin.session_id,
        revision = stored.revision,
        bytes = body.len(),
        "Stored portfolio document"
    );
    Ok(Json(stored.to_wire()?))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    state.login_rate_limiter.check(&request.email).await?;

    let email = match state
        .authority
        .check_credentials(&request.email, &request.password)
    {
        Ok(email) => email,
        Err(error) => {
            tracing::warn!(
                endpoint = "login",
                client = email_fingerprint(&request.email),
                "Rejected admin login"
            );
            return Err(error);
        }
    };

    let token = state.authority.issue(&email)?;
    tracing::info!(
        endpoint = "login",
        client = email_fingerprint(&email),
        expires_at = %token.expires_at,
        "Issued admin session"
    );
    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::{base_vars, config_from};

    async fn app_with(vars: &std::collections::HashMap<&'static str, &'static str>) -> Router {
        let config = Arc::new(config_from(vars).unwrap());
        let store = DocumentStore::open_in_memory().await.unwrap();
        app_router(AppState::new(config, store))
    }

    async fn app() -> Router {
        app_with(&base_vars()).await
    }

    async fn send(app: &Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, payload)
    }

    fn login_request(password: &str) -> HttpRequest<Body> {
        HttpRequest::post("/portfolio/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "admin@example.com", "password": password }).to_string(),
            ))
            .unwrap()
    }

    fn publish_request(token: &str, body: String) -> HttpRequest<Body> {
        HttpRequest::post("/portfolio")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn token(app: &Router) -> String {
        let (status, payload) = send(app, login_request("sensitive-admin-password")).await;
        assert_eq!(status, StatusCode::OK);
        payload["token"].as_str().unwrap().to_string()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_before_publish_returns_empty_object() {
        let app = app().await;
        let request = HttpRequest::get("/portfolio").body(Body::empty()).unwrap();
        assert_eq!(send(&app, request).await, (StatusCode::OK, json!({})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_then_get_round_trips_with_metadata() {
        let app = app().await;
        let token = token(&app).await;

        let document = json!({ "projects": [{ "title": "Engine" }], "_id": "client-side" });
        let (status, stored) = send(&app, publish_request(&token, document.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["__v"], json!(1));
        assert_eq!(stored["_id"], json!("portfolio"));

        let request = HttpRequest::get("/portfolio").body(Body::empty()).unwrap();
        let (status, fetched) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["projects"], json!([{ "title": "Engine" }]));
        assert!(fetched["updatedAt"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_requires_bearer_token() {
        let app = app().await;
        let (status, _) = send(&app, publish_request("garbage", "{}".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = HttpRequest::post("/portfolio")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_rejects_script_content() {
        let app = app().await;
        let token = token(&app).await;
        let body = json!({ "personal": { "bio": "<script>alert(1)</script>" } }).to_string();

        let (status, payload) = send(&app, publish_request(&token, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().unwrap().contains("script-like"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_rejects_oversized_payload() {
        let mut vars = base_vars();
        vars.insert("FOLIO_MAX_PAYLOAD_BYTES", "2048");
        let app = app_with(&vars).await;
        let token = token(&app).await;

        let blob = format!("data:image/png;base64,{}", "A".repeat(4_096));
        let body = json!({ "personal": { "photo": blob } }).to_string();
        let (status, _) = send(&app, publish_request(&token, body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn login_rejects_bad_password_and_rate_limits() {
        let mut vars = base_vars();
        vars.insert("LOGIN_RATE_LIMIT_PER_WINDOW", "2");
        let app = app_with(&vars).await;

        let (status, _) = send(&app, login_request("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, login_request("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(login_request("sensitive-admin-password"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn healthz_reports_revision() {
        let app = app().await;
        let token = token(&app).await;
        send(&app, publish_request(&token, json!({ "faq": [] }).to_string())).await;

        let request = HttpRequest::get("/healthz").body(Body::empty()).unwrap();
        let (status, payload) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["revision"], json!(1));
        assert_eq!(payload["rate_limit"]["login_allowed"], json!(1));
    }
}
