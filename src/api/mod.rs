mod handlers;
pub(crate) mod responses;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete API router.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        // Status
        .route("/api/status", get(handlers::get_status))
        // Device snapshot
        .route("/api/devices", get(handlers::get_devices).post(handlers::ingest_devices))
        .route("/api/devices/{device_id}", get(handlers::get_device))
        .route("/api/histogram", get(handlers::get_histogram))
        // Planning
        .route("/api/plan", post(handlers::handle_generate_plan))
        .route("/api/plans", get(handlers::list_plans))
        .route("/api/plan/{plan_id}", get(handlers::get_plan))
        // Settings
        .route("/api/settings", get(handlers::get_settings).post(handlers::update_settings))
        // SSE events
        .route("/api/events", get(handlers::sse_events))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
