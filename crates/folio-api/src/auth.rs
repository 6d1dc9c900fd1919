use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

const TOKEN_ISSUER: &str = "folio-api";
const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub email: String,
    pub session_id: String,
}

/// Login response body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: String,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and verifies HS256 admin session tokens.
#[derive(Clone)]
pub struct AdminTokenAuthority {
    config: Arc<AppConfig>,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AdminTokenAuthority {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            config,
        }
    }

    /// Check submitted credentials against the configured admin account.
    pub fn check_credentials(&self, email: &str, password: &str) -> Result<String, AppError> {
        let email = email.trim().to_lowercase();
        let email_ok = constant_time_eq(email.as_bytes(), self.config.admin_email.as_bytes());
        let password_ok =
            constant_time_eq(password.as_bytes(), self.config.admin_password.as_bytes());
        if email_ok && password_ok {
            Ok(email)
        } else {
            Err(AppError::unauthorized("Invalid email or password"))
        }
    }

    pub fn issue(&self, email: &str) -> Result<IssuedToken, AppError> {
        let now = chrono::Utc::now();
        let ttl = chrono::Duration::from_std(self.config.token_ttl)
            .map_err(|error| AppError::internal(format!("Invalid token TTL: {error}")))?;
        let expires = now + ttl;

        let claims = AdminClaims {
            sub: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            nbf: Some(now.timestamp()),
            jti: uuid::Uuid::now_v7().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| AppError::internal(format!("Token signing failed: {}", sanitize(&error))))?;

        Ok(IssuedToken {
            token,
            expires_at: expires.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedAdmin, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.leeway = self.config.auth_clock_skew.as_secs();

        let decoded = decode::<AdminClaims>(token, &self.decoding, &validation).map_err(|error| {
            AppError::unauthorized(format!("Token validation failed: {}", sanitize(&error)))
        })?;
        let claims = decoded.claims;

        if claims.role != ADMIN_ROLE {
            return Err(AppError::unauthorized("Token role is not allowed"));
        }
        if claims.sub != self.config.admin_email {
            return Err(AppError::unauthorized("Token subject is not the admin"));
        }
        validate_temporal_claims(&claims, self.config.auth_clock_skew)?;

        Ok(AuthenticatedAdmin {
            email: claims.sub,
            session_id: claims.jti,
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[derive(Debug, Serialize, Deserialize)]
struct AdminClaims {
    sub: String,
    role: String,
    iss: String,
    iat: i64,
    exp: i64,
    nbf: Option<i64>,
    jti: String,
}

fn validate_temporal_claims(
    claims: &AdminClaims,
    clock_skew: std::time::Duration,
) -> Result<(), AppError> {
    let now = chrono::Utc::now().timestamp();
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(0);

    if claims.exp <= now.saturating_sub(skew) {
        return Err(AppError::unauthorized("Token is expired"));
    }
    if claims.iat > now.saturating_add(skew) {
        return Err(AppError::unauthorized("Token `iat` is in the future"));
    }
    if let Some(nbf) = claims.nbf {
        if nbf > now.saturating_add(skew) {
            return Err(AppError::unauthorized("Token is not yet valid"));
        }
    }

    Ok(())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}
