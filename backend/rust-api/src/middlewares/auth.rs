use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    handlers::ApiError,
    models::user::{Account, UserRole},
    services::AppState,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String,    // username
    pub role: UserRole, // trainer | student
    pub exp: usize,     // expiration timestamp
    pub iat: usize,     // issued at timestamp
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Failed to sign token")]
    Signing,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::Signing)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Validates the bearer token and stores its claims in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).map_err(ApiError::from)?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ApiError::from(e)
    })?;

    tracing::debug!(
        "Authenticated user: {} (role: {})",
        claims.sub,
        claims.role.as_str()
    );

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Resolves the claims to a registered account with the expected role.
///
/// A validly signed token whose subject is not one of the fixed accounts is
/// rejected as well, so removing an account from configuration revokes it.
fn require_account(state: &AppState, request: &Request, role: UserRole) -> Result<Account, ApiError> {
    let claims = request
        .extensions()
        .get::<JwtClaims>()
        .ok_or_else(|| ApiError::from(AuthError::MissingToken))?;

    let account = state.accounts.get(&claims.sub).ok_or_else(|| {
        tracing::warn!("Rejected unknown account: {}", claims.sub);
        ApiError::forbidden("Unknown account")
    })?;

    if account.role != role {
        tracing::warn!(
            "Access denied for {}: {} role required",
            account.username,
            role.as_str()
        );
        return Err(match role {
            UserRole::Trainer => ApiError::forbidden("Only trainers can access this function"),
            UserRole::Student => ApiError::forbidden("Only student accounts can request hints"),
        });
    }

    Ok(account.clone())
}

/// Must run after [`auth_middleware`]; inserts the resolved [`Account`].
pub async fn student_guard_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account = require_account(&state, &request, UserRole::Student)?;
    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

/// Must run after [`auth_middleware`]; inserts the resolved [`Account`].
pub async fn trainer_guard_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account = require_account(&state, &request, UserRole::Trainer)?;
    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}
