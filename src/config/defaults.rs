/// Default path of the KEY="VALUE" config file.
pub(super) const DEFAULT_CONFIG_PATH: &str = "/etc/osd-balance/osd-balance.cfg";

/// Default path for the SQLite catalog of snapshots and plans.
pub(super) const DEFAULT_DB_PATH: &str = "/var/lib/osd-balance/catalog.db";

/// Default port the daemon listens on (localhost only).
pub(super) const DEFAULT_PORT: u16 = 7092;

/// CRUSH level whose members never swap with each other.
pub(crate) const DEFAULT_PROTECTED_LEVEL: &str = "host";

/// Minimum stddev reduction (absolute utilization) for a swap to be proposed.
pub(crate) const DEFAULT_MIN_IMPROVEMENT: f64 = 0.0005;

/// Histogram bucket width in utilization percent.
pub(crate) const DEFAULT_BUCKET_WIDTH: f64 = 2.0;

/// Narrowest accepted bucket width (1000 buckets).
pub(crate) const MIN_BUCKET_WIDTH: f64 = 0.1;

/// Devices below this utilization are drawn as freshly added.
pub(crate) const DEFAULT_NEW_DEVICE_THRESHOLD: f64 = 0.001;
