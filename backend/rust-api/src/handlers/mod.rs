use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::middlewares::auth::AuthError;
use crate::services::AppState;

pub mod auth;
pub mod documents;
pub mod hints;
pub mod stats;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", err);
        ApiError::Internal(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing => ApiError::Internal(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "detail": self.to_string(),
            "status": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// GET / - Service banner
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "RAG Tutor API",
        "status": "running",
        "docs": "/docs"
    }))
}

/// GET /health - Liveness plus collaborator availability
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "ragtutor-api",
        "version": env!("CARGO_PKG_VERSION"),
        "qdrant": state.retriever.is_some(),
        "llm": state.generator.is_some(),
        "hint_ledger": state.hint_ledger.backend()
    }))
}

const ROUTES: &[(&str, &str, &str, &str)] = &[
    ("GET", "/", "public", "Service banner"),
    ("GET", "/health", "public", "Liveness and collaborator availability"),
    ("GET", "/docs", "public", "This route catalogue"),
    ("POST", "/token", "public", "Form login (username, password); returns a bearer token"),
    ("GET", "/me", "any account", "Current username and role"),
    ("GET", "/hint/levels", "public", "The four hint levels"),
    ("POST", "/hint", "student", "Next progressive hint for a question"),
    ("POST", "/hint/reset", "student", "Restart one question at level 1"),
    ("POST", "/upload", "trainer", "Upload a .pdf, .sql, .md or .txt file (multipart field `file`)"),
    ("GET", "/stats", "trainer", "Accounts, collaborator status, document and hint counts"),
    ("GET", "/metrics", "basic auth", "Prometheus metrics"),
];

/// GET /docs - Static route catalogue
pub async fn docs() -> impl IntoResponse {
    let routes: Vec<_> = ROUTES
        .iter()
        .map(|(method, path, access, summary)| {
            json!({
                "method": method,
                "path": path,
                "access": access,
                "summary": summary
            })
        })
        .collect();

    Json(json!({
        "title": "RAG Tutor API",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": routes
    }))
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic auth; expected `user:password` comes from METRICS_AUTH
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());

    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
