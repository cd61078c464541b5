mod planner;
pub(crate) mod report;
mod types;

pub(crate) use planner::generate_plan;
pub(crate) use types::{PlanError, PlannerConfig, StopReason, SwapPlan, SwapProposal};
