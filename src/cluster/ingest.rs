use super::device::{DeviceRecord, DomainSegment};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One entry of the `nodes` array in `ceph osd df [tree] -f json`.
#[derive(Debug, Deserialize)]
struct CephNode {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<i64>,
    #[serde(default)]
    device_class: Option<String>,
    /// Capacity in KiB.
    #[serde(default)]
    kb: Option<i64>,
    /// Used space in KiB.
    #[serde(default)]
    kb_used: Option<i64>,
    #[serde(default)]
    crush_weight: Option<f64>,
}

/// Parse a report into device records.
///
/// Accepts a bare array of records, an object with a `devices` array, or the
/// raw output of `ceph osd df tree -f json`. Flat `ceph osd df` output parses
/// too, but its records carry no failure domain path.
pub(crate) fn parse_report(input: &str) -> Result<Vec<DeviceRecord>> {
    let value: Value = serde_json::from_str(input).context("Report is not valid JSON")?;

    match value {
        Value::Array(_) => {
            serde_json::from_value(value).context("Failed to parse device record list")
        }
        Value::Object(mut map) if map.contains_key("nodes") => {
            let nodes: Vec<CephNode> =
                serde_json::from_value(map.remove("nodes").unwrap_or(Value::Null))
                    .context("Failed to parse ceph report nodes")?;
            Ok(records_from_ceph_nodes(&nodes))
        }
        Value::Object(mut map) if map.contains_key("devices") => {
            serde_json::from_value(map.remove("devices").unwrap_or(Value::Null))
                .context("Failed to parse device list")
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => {
            bail!("Unrecognized report: expected a device array, {{\"devices\": [...]}} or ceph `nodes`")
        }
    }
}

fn records_from_ceph_nodes(nodes: &[CephNode]) -> Vec<DeviceRecord> {
    let by_id: HashMap<i64, &CephNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let parent_of: HashMap<i64, i64> =
        nodes.iter().flat_map(|n| n.children.iter().map(move |c| (*c, n.id))).collect();

    let records: Vec<DeviceRecord> = nodes
        .iter()
        .filter(|n| n.kind == "osd")
        .filter(|osd| {
            // Down or out OSDs report no size; they hold nothing to balance.
            let sized = osd.kb.is_some_and(|kb| kb > 0);
            if !sized {
                warn!("Skipping {} (id {}): report gives no capacity", osd.name, osd.id);
            }
            sized
        })
        .map(|osd| DeviceRecord {
            id: osd.id,
            name: Some(osd.name.clone()),
            capacity_bytes: osd.kb.unwrap_or(0).saturating_mul(1024),
            used_bytes: osd.kb_used.unwrap_or(0).saturating_mul(1024),
            failure_domain_path: ancestors(osd.id, &by_id, &parent_of),
            weight: osd.crush_weight,
            device_class: osd.device_class.clone(),
        })
        .collect();

    debug!("Mapped {} OSDs out of {} report nodes", records.len(), nodes.len());
    records
}

/// Walk parent links upward, nearest ancestor first.
fn ancestors(
    id: i64,
    by_id: &HashMap<i64, &CephNode>,
    parent_of: &HashMap<i64, i64>,
) -> Vec<DomainSegment> {
    let mut path = Vec::new();
    let mut current = id;

    // Bounded by the node count in case the report contains a cycle.
    while path.len() < by_id.len() {
        let Some(parent) = parent_of.get(&current).and_then(|p| by_id.get(p)) else {
            break;
        };
        path.push(DomainSegment::new(parent.kind.clone(), parent.name.clone()));
        current = parent.id;
    }

    path
}
