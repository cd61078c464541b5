use super::types::{DeviceState, PlanError, PlannerConfig, StopReason, SwapPlan, SwapProposal};
use crate::cluster::{validate_for_planning, ClusterStats, Device, DomainSegment};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Deviations smaller than this are floating point noise, not imbalance.
const DEVIATION_EPSILON: f64 = 1e-12;

/// Outcome of looking for the next over/under pair.
enum Selection {
    Pair { over: usize, under: usize },
    /// Nothing sits meaningfully above or below the mean.
    Balanced,
    /// Candidates exist but every pairing shares a protected domain.
    Blocked,
}

/// Generate a swap plan for a validated device set.
///
/// The input slice is never modified; swaps are simulated on an index-based
/// working copy and each committed step is recorded as a [`SwapProposal`].
pub(crate) fn generate_plan(
    devices: &[Device],
    config: &PlannerConfig,
) -> Result<SwapPlan, PlanError> {
    validate_for_planning(devices)?;

    let mut states: Vec<DeviceState<'_>> =
        devices.iter().map(|d| DeviceState { device: d, sim_used: d.used_bytes }).collect();

    let initial = current_stats(&states);
    let limit = config.iteration_limit(devices.len());
    let constrained_min_stddev =
        constrained_minimum(devices, &config.protected_level, initial.stddev_utilization);

    info!(
        "Swap planning: {} devices, mean={:.2}%, stddev={:.4}, protected level={}, limit={}",
        devices.len(),
        initial.mean_utilization * 100.0,
        initial.stddev_utilization,
        config.protected_level,
        limit
    );

    let mut swaps: Vec<SwapProposal> = Vec::new();
    let mut iterations = 0usize;

    let stop_reason = loop {
        iterations += 1;
        let stats = current_stats(&states);

        let selection = select_pair(&states, stats.mean_utilization, &config.protected_level);
        let (over, under) = match selection {
            Selection::Pair { over, under } => (over, under),
            Selection::Balanced => break StopReason::Converged,
            Selection::Blocked => break StopReason::NoEligiblePair,
        };

        if swaps.len() >= limit {
            break StopReason::MaxIterations;
        }

        let amount = swap_amount(&states[over], &states[under], stats.mean_utilization)?;
        let projected = projected_stats(&states, over, under, amount);
        let improvement = stats.stddev_utilization - projected.stddev_utilization;

        if amount == 0 || improvement < config.min_improvement {
            debug!(
                "Best swap {} -> {} improves stddev by {:.6}, below threshold {:.6}",
                states[over].device.name,
                states[under].device.name,
                improvement,
                config.min_improvement
            );
            break StopReason::BelowThreshold;
        }

        let step = swaps.len() + 1;
        let proposal = commit_swap(&mut states, over, under, amount, &stats, &projected, step);
        debug!(
            "Swap #{}: {} -> {} ({} bytes), stddev {:.4} -> {:.4}",
            proposal.step,
            proposal.from_name,
            proposal.to_name,
            proposal.bytes,
            proposal.stddev_before,
            proposal.stddev_after
        );
        swaps.push(proposal);
    };

    let projected = current_stats(&states);

    info!(
        "Plan generated: {} swaps, {} bytes, stddev {:.4} -> {:.4} ({})",
        swaps.len(),
        swaps.iter().map(|s| s.bytes).sum::<u64>(),
        initial.stddev_utilization,
        projected.stddev_utilization,
        stop_reason
    );

    Ok(SwapPlan {
        config: config.clone(),
        initial,
        projected,
        constrained_min_stddev,
        iterations,
        stop_reason,
        swaps,
    })
}

fn current_stats(states: &[DeviceState<'_>]) -> ClusterStats {
    ClusterStats::from_utilizations(states.iter().map(DeviceState::sim_utilization))
}

/// Stats of the working copy as if `amount` bytes moved from `over` to `under`.
fn projected_stats(
    states: &[DeviceState<'_>],
    over: usize,
    under: usize,
    amount: u64,
) -> ClusterStats {
    ClusterStats::from_utilizations(states.iter().enumerate().map(move |(i, ds)| {
        let used = if i == over {
            ds.sim_used - amount
        } else if i == under {
            ds.sim_used + amount
        } else {
            ds.sim_used
        };
        crate::cluster::utilization(used, ds.device.capacity_bytes)
    }))
}

/// Order candidates: largest deviation first, then larger capacity, then lower id.
fn candidate_order(states: &[DeviceState<'_>], devs: &[f64], a: usize, b: usize) -> Ordering {
    devs[b]
        .abs()
        .total_cmp(&devs[a].abs())
        .then_with(|| states[b].device.capacity_bytes.cmp(&states[a].device.capacity_bytes))
        .then_with(|| states[a].device.id.cmp(&states[b].device.id))
}

fn select_pair(states: &[DeviceState<'_>], mean: f64, protected_level: &str) -> Selection {
    let devs: Vec<f64> = states.iter().map(|ds| ds.sim_utilization() - mean).collect();

    let mut overs: Vec<usize> = (0..states.len()).filter(|&i| devs[i] > DEVIATION_EPSILON).collect();
    let mut unders: Vec<usize> =
        (0..states.len()).filter(|&i| devs[i] < -DEVIATION_EPSILON).collect();

    if overs.is_empty() || unders.is_empty() {
        return Selection::Balanced;
    }

    overs.sort_by(|&a, &b| candidate_order(states, &devs, a, b));
    unders.sort_by(|&a, &b| candidate_order(states, &devs, a, b));

    for &over in &overs {
        let over_device = states[over].device;
        for &under in &unders {
            let under_device = states[under].device;
            if under_device.device_class != over_device.device_class {
                debug!(
                    "Excluding {} for {}: class {} differs from {}",
                    under_device.name,
                    over_device.name,
                    under_device.device_class,
                    over_device.device_class
                );
                continue;
            }
            if over_device.shares_domain(under_device, protected_level) {
                debug!(
                    "Excluding {} for {}: same {}",
                    under_device.name, over_device.name, protected_level
                );
                continue;
            }
            return Selection::Pair { over, under };
        }
    }

    Selection::Blocked
}

/// Bytes to move so both devices approach the mean without crossing it.
fn swap_amount(
    over: &DeviceState<'_>,
    under: &DeviceState<'_>,
    mean: f64,
) -> Result<u64, PlanError> {
    let excess = (over.sim_utilization() - mean) * over.device.capacity_bytes as f64;
    let deficit = (mean - under.sim_utilization()) * under.device.capacity_bytes as f64;
    // Absorb rounding noise just below a whole byte.
    let raw = (excess.min(deficit) + 1e-9).floor();

    if raw.is_nan() || raw < 0.0 {
        return Err(invariant(over, under, format!("computed swap amount {raw}")));
    }

    let amount = (raw as u64).min(under.sim_free()).min(over.sim_used);

    if under.sim_used + amount > under.device.capacity_bytes {
        return Err(invariant(over, under, format!("{amount} bytes overfill the target")));
    }

    Ok(amount)
}

fn invariant(over: &DeviceState<'_>, under: &DeviceState<'_>, detail: String) -> PlanError {
    PlanError::InternalInvariant {
        from: over.device.id,
        to: under.device.id,
        from_used: over.sim_used,
        to_used: under.sim_used,
        detail,
    }
}

fn commit_swap(
    states: &mut [DeviceState<'_>],
    over: usize,
    under: usize,
    amount: u64,
    before: &ClusterStats,
    after: &ClusterStats,
    step: usize,
) -> SwapProposal {
    let from_before = states[over].sim_utilization();
    let to_before = states[under].sim_utilization();

    states[over].sim_used -= amount;
    states[under].sim_used += amount;

    let from_after = states[over].sim_utilization();
    let to_after = states[under].sim_utilization();

    SwapProposal {
        step,
        from: states[over].device.id,
        from_name: states[over].device.name.clone(),
        to: states[under].device.id,
        to_name: states[under].device.name.clone(),
        bytes: amount,
        delta_from: from_after - from_before,
        delta_to: to_after - to_before,
        from_utilization_after: from_after,
        to_utilization_after: to_after,
        stddev_before: before.stddev_utilization,
        stddev_after: after.stddev_utilization,
    }
}

/// Lower bound on the stddev the class and domain constraints allow.
///
/// Data only moves between devices of one class in different protected
/// domains. If some class spans two or more domains its devices can in
/// principle level out, so the bound is 0. Otherwise no pair can ever form
/// and the initial stddev is exact.
fn constrained_minimum(devices: &[Device], protected_level: &str, initial: f64) -> f64 {
    let mut domains: HashMap<&str, HashSet<&DomainSegment>> = HashMap::new();
    let mut unplaced: HashMap<&str, usize> = HashMap::new();

    for device in devices {
        let class = device.device_class.as_str();
        match device.domain_at(protected_level) {
            Some(segment) => {
                domains.entry(class).or_default().insert(segment);
            }
            None => *unplaced.entry(class).or_default() += 1,
        }
    }

    let movable = domains.keys().chain(unplaced.keys()).any(|class| {
        domains.get(class).map_or(0, HashSet::len) + unplaced.get(class).copied().unwrap_or(0) >= 2
    });

    if movable {
        0.0
    } else {
        initial
    }
}
