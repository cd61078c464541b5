use serde::{Deserialize, Serialize};

/// Bytes per TiB, the unit ceph uses for CRUSH weights.
const TIB: f64 = 1_099_511_627_776.0;

/// One ancestor of a device in the CRUSH hierarchy, e.g. `host=node-a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainSegment {
    pub level: String,
    pub name: String,
}

impl DomainSegment {
    pub fn new(level: impl Into<String>, name: impl Into<String>) -> Self {
        Self { level: level.into(), name: name.into() }
    }
}

/// A device record as handed over by whatever produced the cluster report.
///
/// Byte counts are signed so that nonsense input surfaces as a
/// [`ValidationError`](super::ValidationError) instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub capacity_bytes: i64,
    pub used_bytes: i64,
    /// Ancestors, nearest first (host, rack, ..., root).
    #[serde(default)]
    pub failure_domain_path: Vec<DomainSegment>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub device_class: Option<String>,
}

/// A validated OSD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_class: String,
    /// Ancestors, nearest first (host, rack, ..., root).
    pub failure_domain_path: Vec<DomainSegment>,
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub weight: f64,
}

impl Device {
    /// Build a device from a record that has already passed validation.
    pub(crate) fn from_valid_record(record: DeviceRecord) -> Self {
        let capacity_bytes = record.capacity_bytes as u64;
        Self {
            id: record.id,
            name: record.name.unwrap_or_else(|| format!("osd.{}", record.id)),
            device_class: record.device_class.unwrap_or_else(|| "unknown".to_string()),
            failure_domain_path: record.failure_domain_path,
            capacity_bytes,
            used_bytes: record.used_bytes as u64,
            weight: record.weight.unwrap_or(capacity_bytes as f64 / TIB),
        }
    }

    /// Current utilization as a fraction (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        utilization(self.used_bytes, self.capacity_bytes)
    }

    /// A freshly added OSD that has not started absorbing data yet.
    pub fn is_new(&self, threshold: f64) -> bool {
        self.utilization() < threshold
    }

    /// The ancestor at `level`, if the device's path has one.
    pub fn domain_at(&self, level: &str) -> Option<&DomainSegment> {
        self.failure_domain_path.iter().find(|s| s.level == level)
    }

    /// Whether both devices sit under the same ancestor at `level`.
    pub fn shares_domain(&self, other: &Self, level: &str) -> bool {
        self.failure_domain_path
            .iter()
            .filter(|s| s.level == level)
            .any(|s| other.failure_domain_path.contains(s))
    }
}

pub(crate) fn utilization(used: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    used as f64 / capacity as f64
}
