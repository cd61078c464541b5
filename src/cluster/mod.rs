mod device;
mod ingest;
mod stats;
mod validation;

pub(crate) use device::{utilization, Device, DeviceRecord, DomainSegment};
pub(crate) use ingest::parse_report;
pub(crate) use stats::ClusterStats;
pub(crate) use validation::{validate_for_planning, validate_records, ValidationError};

use anyhow::Result;

/// Parse and validate a report in one step.
pub(crate) fn load_devices(input: &str) -> Result<Vec<Device>> {
    let records = parse_report(input)?;
    Ok(validate_records(records)?)
}
