mod api_tests;
mod balancer_tests;
mod report_tests;

use crate::cluster::{Device, DomainSegment};

/// A device under `host` in a single-root hierarchy.
pub(super) fn device(id: i64, host: &str, capacity: u64, used: u64) -> Device {
    Device {
        id,
        name: format!("osd.{id}"),
        device_class: "hdd".to_string(),
        failure_domain_path: vec![
            DomainSegment::new("host", host),
            DomainSegment::new("root", "default"),
        ],
        capacity_bytes: capacity,
        used_bytes: used,
        weight: 1.0,
    }
}

/// A device under `host` inside `rack`.
pub(super) fn racked_device(id: i64, host: &str, rack: &str, capacity: u64, used: u64) -> Device {
    let mut d = device(id, host, capacity, used);
    d.failure_domain_path.insert(1, DomainSegment::new("rack", rack));
    d
}
