use super::defaults::MIN_BUCKET_WIDTH;
use super::settings::AppConfig;
use anyhow::Result;

impl AppConfig {
    /// Validate configuration values are sane.
    pub(crate) fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.port > 0, "Port must be > 0");
        anyhow::ensure!(
            !self.protected_failure_domain_level.trim().is_empty(),
            "protected_failure_domain_level must not be empty"
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.min_improvement_threshold),
            "min_improvement_threshold must be in [0.0, 1.0)"
        );
        anyhow::ensure!(
            (MIN_BUCKET_WIDTH..=100.0).contains(&self.histogram_bucket_width),
            "histogram_bucket_width must be between {MIN_BUCKET_WIDTH} and 100"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.new_device_threshold),
            "new_device_threshold must be between 0.0 and 1.0"
        );
        Ok(())
    }
}
