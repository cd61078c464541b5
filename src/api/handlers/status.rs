use crate::api::responses::{ApiResponse, StatusResponse};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

pub(crate) async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let device_count = state.db.get_all_devices().map_or(0, |d| d.len());
    let status = state.status.read().await;
    Json(ApiResponse::ok(StatusResponse {
        state: status.state,
        detail: status.detail.clone(),
        device_count,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
