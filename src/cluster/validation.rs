use super::device::{Device, DeviceRecord};
use std::collections::HashSet;
use thiserror::Error;

/// A device record that cannot be planned against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("device {id}: capacity must be positive, got {capacity}")]
    NonPositiveCapacity { id: i64, capacity: i64 },
    #[error("device {id}: used bytes must not be negative, got {used}")]
    NegativeUsed { id: i64, used: i64 },
    #[error("device {id}: used bytes {used} exceed capacity {capacity}")]
    UsedExceedsCapacity { id: i64, used: i64, capacity: i64 },
    #[error("duplicate device id {0}")]
    DuplicateId(i64),
    #[error("device {0} has no failure domain path")]
    MissingFailureDomain(i64),
}

/// Check every record and convert the whole set, or fail on the first bad one.
pub fn validate_records(records: Vec<DeviceRecord>) -> Result<Vec<Device>, ValidationError> {
    let mut seen = HashSet::with_capacity(records.len());

    for record in &records {
        if record.capacity_bytes <= 0 {
            return Err(ValidationError::NonPositiveCapacity {
                id: record.id,
                capacity: record.capacity_bytes,
            });
        }
        if record.used_bytes < 0 {
            return Err(ValidationError::NegativeUsed { id: record.id, used: record.used_bytes });
        }
        if record.used_bytes > record.capacity_bytes {
            return Err(ValidationError::UsedExceedsCapacity {
                id: record.id,
                used: record.used_bytes,
                capacity: record.capacity_bytes,
            });
        }
        if !seen.insert(record.id) {
            return Err(ValidationError::DuplicateId(record.id));
        }
    }

    Ok(records.into_iter().map(Device::from_valid_record).collect())
}

/// Re-check an already converted device set before planning.
///
/// Devices built outside [`validate_records`] (tests, API payloads) come
/// through here too, so the byte invariants are checked again.
pub(crate) fn validate_for_planning(devices: &[Device]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(devices.len());

    for device in devices {
        if device.capacity_bytes == 0 {
            return Err(ValidationError::NonPositiveCapacity { id: device.id, capacity: 0 });
        }
        if device.used_bytes > device.capacity_bytes {
            return Err(ValidationError::UsedExceedsCapacity {
                id: device.id,
                used: device.used_bytes as i64,
                capacity: device.capacity_bytes as i64,
            });
        }
        if !seen.insert(device.id) {
            return Err(ValidationError::DuplicateId(device.id));
        }
        if device.failure_domain_path.is_empty() {
            return Err(ValidationError::MissingFailureDomain(device.id));
        }
    }

    Ok(())
}
