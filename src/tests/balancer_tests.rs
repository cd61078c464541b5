use super::{device, racked_device};
use crate::balancer::{generate_plan, PlanError, PlannerConfig, StopReason, SwapPlan};
use crate::cluster::{ClusterStats, Device, ValidationError};

fn plan(devices: &[Device]) -> SwapPlan {
    generate_plan(devices, &PlannerConfig::default()).unwrap()
}

/// Replay a plan on a copy of the input, checking capacity bounds at every step.
fn replay(devices: &[Device], plan: &SwapPlan) -> Vec<Device> {
    let mut working = devices.to_vec();
    for swap in &plan.swaps {
        let from = working.iter().position(|d| d.id == swap.from).unwrap();
        let to = working.iter().position(|d| d.id == swap.to).unwrap();
        assert!(working[from].used_bytes >= swap.bytes, "swap {} drains below zero", swap.step);
        working[from].used_bytes -= swap.bytes;
        working[to].used_bytes += swap.bytes;
        assert!(
            working[to].used_bytes <= working[to].capacity_bytes,
            "swap {} overfills {}",
            swap.step,
            swap.to_name
        );
    }
    working
}

/// Deterministic mixed cluster: 4 hosts, 5 OSDs each, assorted sizes and fill.
fn mixed_cluster() -> Vec<Device> {
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };
    let sizes = [4_000_000_000_u64, 8_000_000_000, 12_000_000_000, 16_000_000_000];

    (0..20)
        .map(|i| {
            let capacity = sizes[(next() % 4) as usize];
            let used = capacity / 100 * (5 + next() % 90);
            device(i, &format!("host-{}", i % 4), capacity, used)
        })
        .collect()
}

#[test]
fn test_scenario_a_single_swap_to_mean() {
    let devices = vec![
        device(1, "host-a", 1000, 100),
        device(2, "host-b", 1000, 500),
        device(3, "host-c", 1000, 900),
    ];
    let result = plan(&devices);

    assert_eq!(result.swaps.len(), 1, "expected exactly one proposal");
    let swap = &result.swaps[0];
    assert_eq!(swap.from, 3);
    assert_eq!(swap.to, 1);
    assert!((399..=400).contains(&swap.bytes), "moved {} bytes", swap.bytes);
    assert!((swap.from_utilization_after - 0.5).abs() < 0.002);
    assert!((swap.to_utilization_after - 0.5).abs() < 0.002);
    assert!(result.projected.stddev_utilization < 0.002);
}

#[test]
fn test_scenario_b_same_host_blocks_only_pair() {
    let devices = vec![device(1, "host-a", 1000, 100), device(2, "host-a", 1000, 900)];
    let result = plan(&devices);

    assert!(result.swaps.is_empty());
    assert_eq!(result.stop_reason, StopReason::NoEligiblePair);
    assert!((result.constrained_min_stddev - result.initial.stddev_utilization).abs() < 1e-12);
    assert!((result.projected.stddev_utilization - result.initial.stddev_utilization).abs() < 1e-12);
}

#[test]
fn test_scenario_c_balanced_cluster_yields_empty_plan() {
    let devices = vec![
        device(1, "host-a", 1000, 300),
        device(2, "host-b", 2000, 600),
        device(3, "host-c", 3000, 900),
    ];
    let result = plan(&devices);

    assert!(result.swaps.is_empty());
    assert_ne!(result.stop_reason, StopReason::MaxIterations);
    assert!(result.initial.stddev_utilization < 1e-12);
}

#[test]
fn test_scenario_d_used_over_capacity_is_rejected() {
    let devices = vec![device(1, "host-a", 1000, 1001), device(2, "host-b", 1000, 500)];
    let err = generate_plan(&devices, &PlannerConfig::default()).unwrap_err();

    assert!(matches!(
        err,
        PlanError::Validation(ValidationError::UsedExceedsCapacity { id: 1, .. })
    ));
}

#[test]
fn test_missing_failure_domain_is_rejected() {
    let mut orphan = device(7, "host-a", 1000, 100);
    orphan.failure_domain_path.clear();
    let devices = vec![orphan, device(8, "host-b", 1000, 900)];

    let err = generate_plan(&devices, &PlannerConfig::default()).unwrap_err();
    assert!(matches!(err, PlanError::Validation(ValidationError::MissingFailureDomain(7))));
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let devices = vec![device(1, "host-a", 1000, 100), device(1, "host-b", 1000, 900)];
    let err = generate_plan(&devices, &PlannerConfig::default()).unwrap_err();
    assert!(matches!(err, PlanError::Validation(ValidationError::DuplicateId(1))));
}

#[test]
fn test_stddev_never_increases() {
    let devices = mixed_cluster();
    let result = plan(&devices);

    assert!(!result.swaps.is_empty());
    let mut previous = result.initial.stddev_utilization;
    for swap in &result.swaps {
        assert!((swap.stddev_before - previous).abs() < 1e-12, "step {} starts from stale stats", swap.step);
        assert!(swap.stddev_after < swap.stddev_before, "step {} did not improve", swap.step);
        assert!(swap.stddev_before - swap.stddev_after >= result.config.min_improvement);
        previous = swap.stddev_after;
    }
    assert!(result.projected.stddev_utilization <= result.initial.stddev_utilization);
}

#[test]
fn test_swaps_never_share_protected_host() {
    let devices = mixed_cluster();
    let result = plan(&devices);

    for swap in &result.swaps {
        let from = devices.iter().find(|d| d.id == swap.from).unwrap();
        let to = devices.iter().find(|d| d.id == swap.to).unwrap();
        assert!(!from.shares_domain(to, "host"), "swap {} stays on one host", swap.step);
    }
}

#[test]
fn test_swaps_stay_within_capacity() {
    let devices = mixed_cluster();
    let result = plan(&devices);
    let after = replay(&devices, &result);

    let replayed = ClusterStats::compute(&after);
    assert!((replayed.stddev_utilization - result.projected.stddev_utilization).abs() < 1e-9);
}

#[test]
fn test_plan_length_bounded_by_twice_device_count() {
    let devices = mixed_cluster();
    let result = plan(&devices);
    assert!(result.swaps.len() <= 2 * devices.len());
}

#[test]
fn test_max_iterations_caps_plan() {
    let devices = vec![
        device(1, "host-a", 1000, 900),
        device(2, "host-b", 1000, 800),
        device(3, "host-c", 1000, 200),
        device(4, "host-d", 1000, 100),
    ];

    let unbounded = plan(&devices);
    assert_eq!(unbounded.swaps.len(), 2);
    assert_ne!(unbounded.stop_reason, StopReason::MaxIterations);

    let config = PlannerConfig { max_iterations: Some(1), ..PlannerConfig::default() };
    let capped = generate_plan(&devices, &config).unwrap();
    assert_eq!(capped.swaps.len(), 1);
    assert_eq!(capped.stop_reason, StopReason::MaxIterations);
}

#[test]
fn test_ties_prefer_larger_capacity_then_lower_id() {
    let devices = vec![
        device(1, "host-a", 1000, 900),
        device(2, "host-b", 2000, 1800),
        device(4, "host-d", 1000, 100),
        device(3, "host-c", 1000, 100),
    ];
    let result = plan(&devices);

    let first = &result.swaps[0];
    assert_eq!(first.from, 2, "larger device should give first");
    assert_eq!(first.to, 3, "lower id should win the capacity tie");
}

#[test]
fn test_blocked_under_falls_through_to_next_candidate() {
    // The emptiest device shares a host with the fullest one.
    let devices = vec![
        device(1, "host-a", 1000, 900),
        device(2, "host-a", 1000, 100),
        device(3, "host-b", 1000, 300),
        device(4, "host-c", 1000, 700),
    ];
    let result = plan(&devices);

    let first = &result.swaps[0];
    assert_eq!(first.from, 1);
    assert_eq!(first.to, 3);
}

#[test]
fn test_rack_level_protection() {
    let devices = vec![
        racked_device(1, "host-a", "rack-1", 1000, 900),
        racked_device(2, "host-b", "rack-1", 1000, 100),
        racked_device(3, "host-c", "rack-2", 1000, 500),
    ];

    let by_host = plan(&devices);
    assert_eq!(by_host.swaps.len(), 1);
    assert_eq!((by_host.swaps[0].from, by_host.swaps[0].to), (1, 2));

    let config = PlannerConfig { protected_level: "rack".to_string(), ..PlannerConfig::default() };
    let by_rack = generate_plan(&devices, &config).unwrap();
    assert!(by_rack.swaps.is_empty());
    assert_eq!(by_rack.stop_reason, StopReason::NoEligiblePair);
    assert!(by_rack.constrained_min_stddev < 1e-12, "two racks exist");
}

#[test]
fn test_high_threshold_stops_immediately() {
    let devices = vec![device(1, "host-a", 1000, 480), device(2, "host-b", 1000, 520)];
    let config = PlannerConfig { min_improvement: 0.5, ..PlannerConfig::default() };
    let result = generate_plan(&devices, &config).unwrap();

    assert!(result.swaps.is_empty());
    assert_eq!(result.stop_reason, StopReason::BelowThreshold);
}

#[test]
fn test_free_space_caps_swap() {
    // Tiny, nearly full target next to a huge, fuller source.
    let devices = vec![
        device(1, "host-a", 100_000, 99_000),
        device(2, "host-b", 1000, 950),
        device(3, "host-c", 1000, 0),
    ];
    let result = plan(&devices);
    let after = replay(&devices, &result);

    for d in &after {
        assert!(d.used_bytes <= d.capacity_bytes);
    }
}

#[test]
fn test_input_is_not_mutated() {
    let devices = mixed_cluster();
    let before = devices.clone();
    let _ = plan(&devices);
    assert_eq!(devices, before);
}

#[test]
fn test_planning_is_deterministic() {
    let devices = mixed_cluster();
    let first = plan(&devices);
    let second = plan(&devices);
    assert_eq!(first.swaps, second.swaps);
}

#[test]
fn test_empty_device_set_is_converged() {
    let result = plan(&[]);
    assert!(result.swaps.is_empty());
    assert_eq!(result.stop_reason, StopReason::Converged);
}

fn with_class(mut device: Device, class: &str) -> Device {
    device.device_class = class.to_string();
    device
}

#[test]
fn test_swaps_never_cross_device_classes() {
    let devices = vec![
        with_class(device(1, "host-a", 1000, 900), "hdd"),
        with_class(device(2, "host-b", 1000, 100), "ssd"),
    ];
    let result = plan(&devices);

    assert!(result.swaps.is_empty(), "hdd and ssd must not exchange data");
    assert_eq!(result.stop_reason, StopReason::NoEligiblePair);
    assert!(
        (result.constrained_min_stddev - result.initial.stddev_utilization).abs() < 1e-12,
        "no class spans two hosts"
    );
}

#[test]
fn test_class_mismatch_falls_through_to_same_class() {
    let devices = vec![
        with_class(device(1, "host-a", 1000, 900), "hdd"),
        with_class(device(2, "host-b", 1000, 100), "ssd"),
        with_class(device(3, "host-c", 1000, 300), "hdd"),
    ];
    let result = plan(&devices);

    assert_eq!(result.swaps.len(), 1);
    assert_eq!((result.swaps[0].from, result.swaps[0].to), (1, 3));
    assert!(result.constrained_min_stddev < 1e-12, "hdd spans two hosts");
}
