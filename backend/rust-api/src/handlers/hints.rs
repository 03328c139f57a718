use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    handlers::ApiError,
    models::{
        hint::{HintLevel, HintLevelInfo, HintRequest, HintResponse, ResetHintRequest, ResetHintResponse},
        user::Account,
    },
    services::{
        hint_service::{HintError, HintService},
        AppState,
    },
};

impl From<HintError> for ApiError {
    fn from(err: HintError) -> Self {
        match err {
            HintError::Validation(message) => ApiError::BadRequest(message),
            HintError::Unavailable => ApiError::ServiceUnavailable(err.to_string()),
            HintError::Generation(_) => ApiError::BadGateway(err.to_string()),
            HintError::Ledger(e) => ApiError::from(e),
        }
    }
}

/// POST /hint - Next progressive hint (students only)
pub async fn request_hint(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    AppJson(req): AppJson<HintRequest>,
) -> Result<Json<HintResponse>, ApiError> {
    let response = HintService::from_state(&state)
        .request_hint(&account, &req)
        .await?;

    Ok(Json(response))
}

/// POST /hint/reset - Start a question over at level 1
pub async fn reset_hint(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    AppJson(req): AppJson<ResetHintRequest>,
) -> Result<Json<ResetHintResponse>, ApiError> {
    let response = HintService::from_state(&state)
        .reset_hint(&account, &req)
        .await?;

    Ok(Json(response))
}

/// GET /hint/levels
pub async fn list_levels() -> Json<Vec<HintLevelInfo>> {
    Json(HintLevel::ALL.into_iter().map(HintLevelInfo::from).collect())
}
