use crate::api::responses::{ApiResponse, PlanRequest};
use crate::balancer::{self, PlanError};
use crate::db::{PlanListing, StoredPlan};
use crate::events::Event;
use crate::{AppState, DaemonState, DaemonStatus};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;

pub(crate) async fn handle_generate_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> impl IntoResponse {
    {
        let status = state.status.read().await;
        if status.state != DaemonState::Idle {
            return Json(ApiResponse::<StoredPlan>::err(format!(
                "Cannot generate plan: daemon is currently {:?}",
                status.state
            )));
        }
    }

    let mut config = state.config.planner_config();
    if let Some(level) = req.protected_level {
        config.protected_level = level;
    }
    if let Some(threshold) = req.min_improvement {
        config.min_improvement = threshold;
    }
    if let Some(limit) = req.max_iterations {
        config.max_iterations = Some(limit);
    }

    let devices = match state.db.get_all_devices() {
        Ok(d) if d.is_empty() => {
            return Json(ApiResponse::<StoredPlan>::err("No device snapshot has been ingested"));
        }
        Ok(d) => d,
        Err(e) => return Json(ApiResponse::<StoredPlan>::err(format!("{e}"))),
    };

    *state.status.write().await = DaemonStatus::planning();
    let result = balancer::generate_plan(&devices, &config);
    *state.status.write().await = DaemonStatus::idle();

    let plan = match result {
        Ok(plan) => plan,
        Err(e @ PlanError::InternalInvariant { .. }) => {
            error!("{e}");
            let _ = state.event_hub.publish(Event::DaemonError { message: e.to_string() });
            return Json(ApiResponse::<StoredPlan>::err(format!("Planning failed: {e}")));
        }
        Err(e @ PlanError::Validation(_)) => {
            return Json(ApiResponse::<StoredPlan>::err(format!("Planning failed: {e}")));
        }
    };

    let plan_id = match state.db.insert_plan(&plan) {
        Ok(id) => id,
        Err(e) => return Json(ApiResponse::<StoredPlan>::err(format!("Failed to store plan: {e}"))),
    };

    let _ = state.event_hub.publish(Event::PlanReady {
        plan_id,
        total_swaps: plan.swaps.len() as u32,
        total_bytes: plan.total_bytes(),
        projected_stddev: plan.projected.stddev_utilization,
    });

    let created_at = state.db.get_plan(plan_id).ok().flatten().and_then(|p| p.created_at);
    Json(ApiResponse::ok(StoredPlan { id: plan_id, created_at, plan }))
}

pub(crate) async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(plan_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.get_plan(plan_id) {
        Ok(Some(plan)) => Json(ApiResponse::ok(plan)),
        Ok(None) => Json(ApiResponse::<StoredPlan>::err("Plan not found")),
        Err(e) => Json(ApiResponse::<StoredPlan>::err(format!("{e}"))),
    }
}

pub(crate) async fn list_plans(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.list_plans() {
        Ok(plans) => Json(ApiResponse::ok(plans)),
        Err(e) => Json(ApiResponse::<Vec<PlanListing>>::err(format!("{e}"))),
    }
}
