use super::settings::AppConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl AppConfig {
    /// Parse the simple KEY="VALUE" config format.
    pub(crate) fn parse_ini(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "PORT" => {
                        if let Ok(v) = value.parse() {
                            self.port = v;
                        }
                    }
                    "DB_PATH" => {
                        if !value.is_empty() {
                            self.db_path = value.to_string();
                        }
                    }
                    "PROTECTED_FAILURE_DOMAIN_LEVEL" => {
                        if !value.is_empty() {
                            self.protected_failure_domain_level = value.to_string();
                        }
                    }
                    "MIN_IMPROVEMENT_THRESHOLD" => {
                        if let Ok(v) = value.parse() {
                            self.min_improvement_threshold = v;
                        }
                    }
                    "MAX_ITERATIONS" => {
                        // Empty or "auto" falls back to twice the device count.
                        self.max_iterations = value.parse().ok();
                    }
                    "HISTOGRAM_BUCKET_WIDTH" => {
                        if let Ok(v) = value.parse() {
                            self.histogram_bucket_width = v;
                        }
                    }
                    "NEW_DEVICE_THRESHOLD" => {
                        if let Ok(v) = value.parse() {
                            self.new_device_threshold = v;
                        }
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }
    }

    /// Save current config back to the KEY="VALUE" file.
    pub fn save(&self) -> Result<()> {
        let max_iterations = self.max_iterations.map_or_else(|| "auto".to_string(), |v| v.to_string());

        let contents = format!(
            r#"# osd-balance configuration
# Auto-generated by the settings API
PORT="{}"
DB_PATH="{}"
PROTECTED_FAILURE_DOMAIN_LEVEL="{}"
MIN_IMPROVEMENT_THRESHOLD="{}"
MAX_ITERATIONS="{}"
HISTOGRAM_BUCKET_WIDTH="{}"
NEW_DEVICE_THRESHOLD="{}"
"#,
            self.port,
            self.db_path,
            self.protected_failure_domain_level,
            self.min_improvement_threshold,
            max_iterations,
            self.histogram_bucket_width,
            self.new_device_threshold,
        );

        if let Some(parent) = Path::new(&self.config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config to {}", self.config_path))?;

        Ok(())
    }
}
