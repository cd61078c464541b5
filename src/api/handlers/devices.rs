use crate::api::responses::{ApiResponse, DeviceView, DevicesResponse};
use crate::cluster::{self, ClusterStats};
use crate::events::Event;
use crate::{AppState, DaemonState, DaemonStatus};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn get_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.get_all_devices() {
        Ok(devices) => Json(ApiResponse::ok(DevicesResponse::build(
            devices,
            state.config.new_device_threshold,
        ))),
        Err(e) => Json(ApiResponse::<DevicesResponse>::err(format!("Failed to get devices: {e}"))),
    }
}

pub(crate) async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<i64>,
) -> impl IntoResponse {
    let device = match state.db.get_device(device_id) {
        Ok(Some(d)) => d,
        Ok(None) => return Json(ApiResponse::<DeviceView>::err("Device not found")),
        Err(e) => return Json(ApiResponse::<DeviceView>::err(format!("{e}"))),
    };

    // Deviation is relative to the whole snapshot, not just this device.
    let stats = match state.db.get_all_devices() {
        Ok(all) => ClusterStats::compute(&all),
        Err(e) => return Json(ApiResponse::<DeviceView>::err(format!("{e}"))),
    };

    Json(ApiResponse::ok(DeviceView {
        utilization: device.utilization(),
        deviation: stats.deviation(&device),
        is_new: device.is_new(state.config.new_device_threshold),
        device,
    }))
}

/// Replace the stored snapshot with the devices in the request body.
///
/// The body may be a normalized device list or raw `ceph osd df tree -f json`.
pub(crate) async fn ingest_devices(
    State(state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    {
        let status = state.status.read().await;
        if status.state != DaemonState::Idle {
            return Json(ApiResponse::<ClusterStats>::err(format!(
                "Cannot ingest devices: daemon is currently {:?}",
                status.state
            )));
        }
    }

    *state.status.write().await = DaemonStatus::ingesting("Validating device report");

    let result = cluster::load_devices(&body).and_then(|devices| {
        state.db.replace_devices(&devices)?;
        Ok(ClusterStats::compute(&devices))
    });

    *state.status.write().await = DaemonStatus::idle();

    match result {
        Ok(stats) => {
            info!(
                "Ingested {} devices: mean={:.2}%, stddev={:.4}",
                stats.device_count,
                stats.mean_utilization * 100.0,
                stats.stddev_utilization
            );
            let _ = state.event_hub.publish(Event::DevicesIngested {
                device_count: stats.device_count as u32,
                mean_utilization: stats.mean_utilization,
                stddev_utilization: stats.stddev_utilization,
            });
            Json(ApiResponse::ok(stats))
        }
        Err(e) => {
            warn!("Rejected device report: {e:#}");
            Json(ApiResponse::<ClusterStats>::err(format!("Ingest failed: {e:#}")))
        }
    }
}
