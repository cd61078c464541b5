use super::types::SwapPlan;
use crate::cluster::{utilization, Device};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with binary units, e.g. `1.50 GiB`.
pub(crate) fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Aggregate fill of a group of devices before and after the plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GroupUsage {
    pub devices: usize,
    pub capacity: u64,
    pub used_before: u64,
    pub used_after: u64,
}

/// Used bytes per device id once every swap in `plan` has been applied.
fn replay_used(devices: &[Device], plan: &SwapPlan) -> HashMap<i64, u64> {
    let mut used: HashMap<i64, u64> = devices.iter().map(|d| (d.id, d.used_bytes)).collect();
    for swap in &plan.swaps {
        if let Some(from) = used.get_mut(&swap.from) {
            *from = from.saturating_sub(swap.bytes);
        }
        if let Some(to) = used.get_mut(&swap.to) {
            *to += swap.bytes;
        }
    }
    used
}

/// Group devices by `key` and sum their usage before and after the plan.
pub(crate) fn group_usage<F>(
    devices: &[Device],
    plan: &SwapPlan,
    key: F,
) -> BTreeMap<String, GroupUsage>
where
    F: Fn(&Device) -> String,
{
    let after = replay_used(devices, plan);
    let mut groups: BTreeMap<String, GroupUsage> = BTreeMap::new();

    for device in devices {
        let group = groups.entry(key(device)).or_default();
        group.devices += 1;
        group.capacity += device.capacity_bytes;
        group.used_before += device.used_bytes;
        group.used_after += after.get(&device.id).copied().unwrap_or(device.used_bytes);
    }

    groups
}

fn write_groups(out: &mut String, heading: &str, groups: &BTreeMap<String, GroupUsage>) {
    let _ = writeln!(out, "---------- Usage by {heading} (before -> after):");
    let width = groups.keys().map(String::len).max().unwrap_or(0);
    for (name, group) in groups {
        let _ = writeln!(
            out,
            "  {name:<width$}  {:>3} devices  {:>6.2}% -> {:>6.2}%",
            group.devices,
            utilization(group.used_before, group.capacity) * 100.0,
            utilization(group.used_after, group.capacity) * 100.0
        );
    }
}

/// Render a plan as the human-readable report printed by `osd-balance plan`.
///
/// `devices` must be the set the plan was generated from.
pub(crate) fn render_text(devices: &[Device], plan: &SwapPlan) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "---------- Initial state: {} devices, mean {:.2}%, stddev {:.4}",
        plan.initial.device_count,
        plan.initial.mean_utilization * 100.0,
        plan.initial.stddev_utilization
    );
    let _ = writeln!(out, "Protected failure domain: {}", plan.config.protected_level);
    let _ = writeln!(out);
    let _ = writeln!(out, "---------- Swap steps:");

    if plan.swaps.is_empty() {
        let _ = writeln!(out, "  (none)");
    }

    for swap in &plan.swaps {
        let _ = writeln!(out, "Swap #{}:", swap.step);
        let _ = writeln!(
            out,
            "  {} -> {}: move {}",
            swap.from_name,
            swap.to_name,
            format_bytes(swap.bytes)
        );
        let _ = writeln!(
            out,
            "  {} {:+.2}% -> {:.2}%, {} {:+.2}% -> {:.2}%",
            swap.from_name,
            swap.delta_from * 100.0,
            swap.from_utilization_after * 100.0,
            swap.to_name,
            swap.delta_to * 100.0,
            swap.to_utilization_after * 100.0
        );
        let _ = writeln!(out, "  stddev {:.4} -> {:.4}", swap.stddev_before, swap.stddev_after);
    }

    let level = plan.config.protected_level.as_str();
    let by_domain = group_usage(devices, plan, |d| {
        d.domain_at(level).map_or_else(|| "(unplaced)".to_string(), |s| s.name.clone())
    });
    let by_class = group_usage(devices, plan, |d| d.device_class.clone());

    let _ = writeln!(out);
    write_groups(&mut out, level, &by_domain);
    let _ = writeln!(out);
    write_groups(&mut out, "class", &by_class);

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "---------- Summary: stddev {:.4} -> {:.4} (constrained lower bound {:.4}), \
         {} swaps, {} moved, {} iterations, stopped: {}",
        plan.initial.stddev_utilization,
        plan.projected.stddev_utilization,
        plan.constrained_min_stddev,
        plan.swaps.len(),
        format_bytes(plan.total_bytes()),
        plan.iterations,
        plan.stop_reason
    );

    out
}
