use crate::cluster::{ClusterStats, Device};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) const fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub(crate) fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

/// Request body for POST /api/plan. Unset fields fall back to the daemon config.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlanRequest {
    pub protected_level: Option<String>,
    pub min_improvement: Option<f64>,
    pub max_iterations: Option<usize>,
}

/// Request body for POST /api/settings.
#[derive(Debug, Deserialize)]
pub(crate) struct SettingsUpdateRequest {
    pub protected_failure_domain_level: Option<String>,
    pub min_improvement_threshold: Option<f64>,
    pub max_iterations: Option<usize>,
    pub histogram_bucket_width: Option<f64>,
    pub new_device_threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub state: crate::DaemonState,
    pub detail: Option<String>,
    /// Devices in the stored snapshot.
    pub device_count: usize,
    pub version: String,
}

/// A device as shown by the API, with its derived utilization figures.
#[derive(Debug, Serialize)]
pub(crate) struct DeviceView {
    #[serde(flatten)]
    pub device: Device,
    pub utilization: f64,
    pub deviation: f64,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct DevicesResponse {
    pub stats: ClusterStats,
    pub devices: Vec<DeviceView>,
}

impl DevicesResponse {
    pub(crate) fn build(devices: Vec<Device>, new_device_threshold: f64) -> Self {
        let stats = ClusterStats::compute(&devices);
        let devices = devices
            .into_iter()
            .map(|device| DeviceView {
                utilization: device.utilization(),
                deviation: stats.deviation(&device),
                is_new: device.is_new(new_device_threshold),
                device,
            })
            .collect();
        Self { stats, devices }
    }
}
