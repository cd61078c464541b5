use crate::cluster::{utilization, ClusterStats, Device};
use crate::config::{DEFAULT_MIN_IMPROVEMENT, DEFAULT_PROTECTED_LEVEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Internal working state for a device during planning.
#[derive(Debug, Clone)]
pub(crate) struct DeviceState<'a> {
    pub device: &'a Device,
    /// Simulated used bytes (changes as swaps are planned).
    pub sim_used: u64,
}

impl DeviceState<'_> {
    pub(crate) fn sim_utilization(&self) -> f64 {
        utilization(self.sim_used, self.device.capacity_bytes)
    }

    pub(crate) const fn sim_free(&self) -> u64 {
        self.device.capacity_bytes.saturating_sub(self.sim_used)
    }
}

/// Tunables for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// CRUSH level whose members may not swap with each other.
    pub protected_level: String,
    /// Smallest stddev reduction worth proposing a swap for.
    pub min_improvement: f64,
    /// Upper bound on proposals; `None` means twice the device count.
    pub max_iterations: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            protected_level: DEFAULT_PROTECTED_LEVEL.to_string(),
            min_improvement: DEFAULT_MIN_IMPROVEMENT,
            max_iterations: None,
        }
    }
}

impl PlannerConfig {
    pub(crate) fn iteration_limit(&self, device_count: usize) -> usize {
        self.max_iterations.unwrap_or(2 * device_count)
    }
}

/// One proposed exchange of used capacity between two devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapProposal {
    /// 1-based position in the plan.
    pub step: usize,
    /// Over-utilized device giving up data.
    pub from: i64,
    pub from_name: String,
    /// Under-utilized device taking data.
    pub to: i64,
    pub to_name: String,
    pub bytes: u64,
    pub delta_from: f64,
    pub delta_to: f64,
    pub from_utilization_after: f64,
    pub to_utilization_after: f64,
    pub stddev_before: f64,
    pub stddev_after: f64,
}

/// Why the planning loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No device deviates from the mean.
    Converged,
    /// The best remaining swap would not reduce stddev enough.
    BelowThreshold,
    /// Every over/under pair shares a protected failure domain.
    NoEligiblePair,
    MaxIterations,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::BelowThreshold => "below_threshold",
            Self::NoEligiblePair => "no_eligible_pair",
            Self::MaxIterations => "max_iterations",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StopReason {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "converged" => Ok(Self::Converged),
            "below_threshold" => Ok(Self::BelowThreshold),
            "no_eligible_pair" => Ok(Self::NoEligiblePair),
            "max_iterations" => Ok(Self::MaxIterations),
            _ => Err(format!("invalid stop reason: {s}")),
        }
    }
}

/// Result of running the swap planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapPlan {
    pub config: PlannerConfig,
    pub initial: ClusterStats,
    pub projected: ClusterStats,
    /// Lower bound on the stddev reachable under the class and failure-domain constraints.
    pub constrained_min_stddev: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub swaps: Vec<SwapProposal>,
}

impl SwapPlan {
    pub fn total_bytes(&self) -> u64 {
        self.swaps.iter().map(|s| s.bytes).sum()
    }
}

/// Planning failures. Unbalanceable clusters are not errors; they yield a
/// shorter plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid device set: {0}")]
    Validation(#[from] crate::cluster::ValidationError),
    #[error(
        "planner invariant violated swapping {from} (used {from_used}) -> {to} (used {to_used}): {detail}"
    )]
    InternalInvariant { from: i64, to: i64, from_used: u64, to_used: u64, detail: String },
}
