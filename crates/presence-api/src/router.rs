//! Axum router construction.
//!
//! Assembles all routes into a single [`Router`] with request tracing and
//! CORS enabled for the read-only API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `POST /log` -- ingest one GPS ping
/// - `GET /health` -- liveness and catalog size
/// - `GET /api/places` -- place catalog snapshot
/// - `GET /api/intervals` -- most recent intervals
/// - `GET /api/intervals/latest` -- latest interval
///
/// CORS allows any origin so a timeline dashboard can read the API from
/// another host.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Ingestion
        .route("/log", post(handlers::log_position))
        // Health
        .route("/health", get(handlers::health))
        // REST API
        .route("/api/places", get(handlers::list_places))
        .route("/api/intervals", get(handlers::list_intervals))
        .route("/api/intervals/latest", get(handlers::latest_interval))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
