use super::defaults::{
    DEFAULT_BUCKET_WIDTH, DEFAULT_CONFIG_PATH, DEFAULT_DB_PATH, DEFAULT_MIN_IMPROVEMENT,
    DEFAULT_NEW_DEVICE_THRESHOLD, DEFAULT_PORT, DEFAULT_PROTECTED_LEVEL,
};
use crate::balancer::PlannerConfig;
use crate::histogram::HistogramOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub config_path: String,
    /// CRUSH level (e.g. "host", "rack") whose members may not swap with each other.
    pub protected_failure_domain_level: String,
    /// Smallest stddev reduction worth a proposal.
    pub min_improvement_threshold: f64,
    /// Cap on proposals per plan. Unset means twice the device count.
    pub max_iterations: Option<usize>,
    /// Histogram bucket width in percent.
    pub histogram_bucket_width: f64,
    pub new_device_threshold: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: DEFAULT_DB_PATH.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            protected_failure_domain_level: DEFAULT_PROTECTED_LEVEL.to_string(),
            min_improvement_threshold: DEFAULT_MIN_IMPROVEMENT,
            max_iterations: None,
            histogram_bucket_width: DEFAULT_BUCKET_WIDTH,
            new_device_threshold: DEFAULT_NEW_DEVICE_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Load configuration, merging defaults with config file values and env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("OSDB_CONFIG_PATH") {
            config.config_path = path;
        }
        if let Ok(path) = std::env::var("OSDB_DB_PATH") {
            config.db_path = path;
        }
        if let Ok(port) = std::env::var("OSDB_PORT") {
            config.port = port.parse().context("OSDB_PORT must be a valid port number")?;
        }
        if let Ok(level) = std::env::var("OSDB_PROTECTED_LEVEL") {
            config.protected_failure_domain_level = level;
        }

        let cfg_path = Path::new(&config.config_path);
        if cfg_path.exists() {
            let contents = fs::read_to_string(cfg_path)
                .with_context(|| format!("Failed to read config file: {}", config.config_path))?;
            config.parse_ini(&contents);
        }

        config.validate()?;
        Ok(config)
    }

    /// Planner settings derived from this configuration.
    pub(crate) fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            protected_level: self.protected_failure_domain_level.clone(),
            min_improvement: self.min_improvement_threshold,
            max_iterations: self.max_iterations,
        }
    }

    pub(crate) fn histogram_options(&self, title: impl Into<String>) -> HistogramOptions {
        HistogramOptions {
            title: title.into(),
            bucket_width: self.histogram_bucket_width,
            new_device_threshold: self.new_device_threshold,
        }
    }
}
