use crate::balancer::SwapPlan;
use serde::{Deserialize, Serialize};

/// A persisted swap plan with its catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlan {
    pub id: i64,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub plan: SwapPlan,
}

/// Summary row for listing plans without loading their swaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanListing {
    pub id: i64,
    pub created_at: Option<String>,
    pub device_count: usize,
    pub initial_stddev: f64,
    pub projected_stddev: f64,
    pub total_swaps: usize,
    pub total_bytes: u64,
    pub stop_reason: String,
}
