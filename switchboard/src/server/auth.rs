//! Authentication seam for the RPC endpoint.
//!
//! The runtime only defines the extraction interface; real OIDC validation
//! is an external collaborator plugged in through [`AuthExtractor`]. The
//! bundled [`BearerAuthExtractor`] enforces that a bearer token is present
//! and well-formed, leaving signature and claim verification to the
//! deployment's extractor.

use async_trait::async_trait;
use axum::{
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::AuthConfig;

/// Authentication context extracted from an HTTP request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated principal, as reported by the extractor.
    pub subject: String,
}

/// Extracts authentication from HTTP requests guarding the RPC endpoint.
#[async_trait]
pub trait AuthExtractor: Send + Sync + 'static {
    async fn extract(&self, parts: &mut Parts) -> Result<AuthContext, AuthError>;
}

/// Authentication error convertible to an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication credentials")]
    MissingCredentials,

    #[error("invalid authentication token")]
    InvalidToken,

    #[error("authentication failed: {0}")]
    Failed(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = serde_json::json!({
            "error": message,
            "code": StatusCode::UNAUTHORIZED.as_u16(),
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Checks that the request carries a non-empty `Authorization: Bearer`
/// token for the configured issuer/audience pair.
pub struct BearerAuthExtractor {
    issuer: String,
    audience: String,
}

impl BearerAuthExtractor {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// The issuer this extractor was configured for.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The audience this extractor was configured for.
    pub fn audience(&self) -> &str {
        &self.audience
    }
}

#[async_trait]
impl AuthExtractor for BearerAuthExtractor {
    async fn extract(&self, parts: &mut Parts) -> Result<AuthContext, AuthError> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthContext {
            subject: "bearer".to_string(),
        })
    }
}
