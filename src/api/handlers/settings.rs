use crate::api::responses::{ApiResponse, SettingsUpdateRequest};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

pub(crate) async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.config.clone()))
}

pub(crate) async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettingsUpdateRequest>,
) -> impl IntoResponse {
    let mut config = state.config.clone();

    if let Some(v) = req.protected_failure_domain_level {
        config.protected_failure_domain_level = v;
    }
    if let Some(v) = req.min_improvement_threshold {
        config.min_improvement_threshold = v;
    }
    if let Some(v) = req.max_iterations {
        config.max_iterations = Some(v);
    }
    if let Some(v) = req.histogram_bucket_width {
        config.histogram_bucket_width = v;
    }
    if let Some(v) = req.new_device_threshold {
        config.new_device_threshold = v;
    }

    if let Err(e) = config.validate() {
        return Json(ApiResponse::<&str>::err(format!("Invalid settings: {e}")));
    }

    match config.save() {
        Ok(()) => Json(ApiResponse::ok("Settings saved (restart to apply)")),
        Err(e) => Json(ApiResponse::<&str>::err(format!("Failed to save settings: {e}"))),
    }
}
