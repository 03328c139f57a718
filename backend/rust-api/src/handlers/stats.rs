use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    handlers::ApiError,
    models::StatsResponse,
    services::{stats_service::StatsService, AppState},
};

/// GET /stats - Trainer dashboard
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = StatsService::new(&state).collect().await?;
    Ok(Json(stats))
}
