//! HTTP API for the registry

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{
    AppState, AppendRequest, AppendResponse, CreateRequest, CreateResponse, ItemQuery,
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/products", post(handlers::create_item))
        .route("/v1/products/{id}", get(handlers::get_current))
        .route("/v1/products/{id}/snapshots", post(handlers::append_snapshot))
        .route("/v1/products/{id}/history", get(handlers::get_history))
        .route("/v1/item", get(handlers::get_current_by_query))
        .route("/v1/item/snapshots", post(handlers::append_snapshot_by_query))
        .route("/v1/item/history", get(handlers::get_history_by_query))
        .route("/v1/count", get(handlers::get_count))
        .route("/v1/notifications", get(handlers::stream_notifications))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit_bytes)),
        )
        .with_state(state)
}
