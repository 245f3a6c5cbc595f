//! API layer - HTTP handlers and routing
//!
//! - Report management endpoints under `/oracle`
//! - Health probe
//! - Shared state, errors and the token-checking extractor

pub mod common;
pub mod middleware;
pub mod reports;
pub mod responses;


use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, Authorized, RequestStats};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    total_requests: u64,
    avg_response_time_us: f64,
}

async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {:#}", e);
        ApiError::internal_error("Database unavailable")
    })?;

    let stats = &state.request_stats;
    Ok(Json(HealthResponse {
        status: "ok",
        uptime_seconds: stats.uptime_seconds(),
        total_requests: stats.total_requests(),
        avg_response_time_us: stats.avg_response_time_us(),
    }))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/oracle", reports::router())
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost, runs for all requests
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state))
}
