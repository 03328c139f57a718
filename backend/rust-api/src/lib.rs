use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/docs", get(handlers::docs))
        .route("/token", post(handlers::auth::login))
        .route("/hint/levels", get(handlers::hints::list_levels))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .merge(account_routes(app_state.clone()))
        .merge(student_routes(app_state.clone()))
        .merge(trainer_routes(app_state.clone()))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Any registered account
fn account_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(handlers::auth::me))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn student_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/hint", post(handlers::hints::request_hint))
        .route("/hint/reset", post(handlers::hints::reset_hint))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::student_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn trainer_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload",
            post(handlers::documents::upload_document).layer(DefaultBodyLimit::max(
                handlers::documents::MAX_UPLOAD_BYTES,
            )),
        )
        .route("/stats", get(handlers::stats::get_stats))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::trainer_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}
