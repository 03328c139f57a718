use axum::{
    extract::{Extension, State},
    Form, Json,
};
use std::sync::Arc;

use crate::{
    handlers::ApiError,
    metrics::LOGIN_ATTEMPTS_TOTAL,
    middlewares::auth::JwtClaims,
    models::user::{LoginForm, TokenResponse, UserProfile},
    services::{auth_service::AuthService, AppState},
};

/// POST /token - Form login, returns a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let service = AuthService::new(&state);

    match service.login(&form)? {
        Some(token) => {
            LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
            Ok(Json(token))
        }
        None => {
            LOGIN_ATTEMPTS_TOTAL.with_label_values(&["failure"]).inc();
            Err(ApiError::unauthorized("Incorrect username or password"))
        }
    }
}

/// GET /me - Current account
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = state
        .accounts
        .get(&claims.sub)
        .ok_or_else(|| ApiError::forbidden("Unknown account"))?;

    Ok(Json(UserProfile::from(account)))
}
