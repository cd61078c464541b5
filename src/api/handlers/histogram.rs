use crate::api::responses::ApiResponse;
use crate::cluster::ClusterStats;
use crate::{histogram, AppState};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

pub(crate) async fn get_histogram(State(state): State<Arc<AppState>>) -> Response {
    let devices = match state.db.get_all_devices() {
        Ok(d) => d,
        Err(e) => {
            return Json(ApiResponse::<&str>::err(format!("Failed to get devices: {e}")))
                .into_response();
        }
    };

    let stats = ClusterStats::compute(&devices);
    let title = format!("OSD utilization, {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    match histogram::render_svg(&devices, &stats, &state.config.histogram_options(title)) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => Json(ApiResponse::<&str>::err(format!("Failed to render histogram: {e}")))
            .into_response(),
    }
}
