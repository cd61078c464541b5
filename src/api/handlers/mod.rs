mod devices;
mod histogram;
mod plan;
mod settings;
mod sse;
mod status;

pub(super) use devices::{get_device, get_devices, ingest_devices};
pub(super) use histogram::get_histogram;
pub(super) use plan::{get_plan, handle_generate_plan, list_plans};
pub(super) use settings::{get_settings, update_settings};
pub(super) use sse::sse_events;
pub(super) use status::get_status;
