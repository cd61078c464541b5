use super::device;
use crate::balancer::report::{format_bytes, group_usage, render_text, GroupUsage};
use crate::balancer::{generate_plan, PlannerConfig};

#[test]
fn test_format_bytes() {
    assert_eq!(format_bytes(512), "512 B");
    assert_eq!(format_bytes(1536), "1.50 KiB");
    assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
}

#[test]
fn test_report_lists_swaps_and_summary() {
    let devices = vec![
        device(1, "host-a", 1000, 100),
        device(2, "host-b", 1000, 500),
        device(3, "host-c", 1000, 900),
    ];
    let plan = generate_plan(&devices, &PlannerConfig::default()).unwrap();
    let text = render_text(&devices, &plan);

    assert!(text.contains("Swap #1:"));
    assert!(text.contains("osd.3 -> osd.1"));
    assert!(text.contains("1 swaps"));
    assert!(text.contains("stopped: converged"));
}

#[test]
fn test_report_for_blocked_cluster() {
    let devices = vec![device(1, "host-a", 1000, 100), device(2, "host-a", 1000, 900)];
    let plan = generate_plan(&devices, &PlannerConfig::default()).unwrap();
    let text = render_text(&devices, &plan);

    assert!(text.contains("(none)"));
    assert!(text.contains("stddev 0.4000 -> 0.4000 (constrained lower bound 0.4000)"));
    assert!(text.contains("stopped: no_eligible_pair"));
}

#[test]
fn test_report_groups_usage_by_host_and_class() {
    let devices = vec![
        device(1, "host-a", 1000, 100),
        device(2, "host-b", 1000, 500),
        device(3, "host-c", 1000, 900),
    ];
    let plan = generate_plan(&devices, &PlannerConfig::default()).unwrap();
    let moved = plan.swaps[0].bytes;

    let by_host = group_usage(&devices, &plan, |d| d.failure_domain_path[0].name.clone());
    assert_eq!(
        by_host["host-c"],
        GroupUsage { devices: 1, capacity: 1000, used_before: 900, used_after: 900 - moved }
    );
    assert_eq!(by_host["host-a"].used_after, 100 + moved);
    assert_eq!(by_host["host-b"].used_after, 500);

    let by_class = group_usage(&devices, &plan, |d| d.device_class.clone());
    assert_eq!(by_class.len(), 1);
    assert_eq!(by_class["hdd"].used_before, by_class["hdd"].used_after, "swaps conserve bytes");

    let text = render_text(&devices, &plan);
    assert!(text.contains("---------- Usage by host (before -> after):"));
    assert!(text.contains("---------- Usage by class (before -> after):"));
    assert!(text.contains("host-c"));
}
