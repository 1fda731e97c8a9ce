//! Agent configuration loader.

use std::path::Path;

use anyhow::Context;
use grasp_core::GraspConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for agent configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a [`GraspConfig`] from a TOML file.
    pub fn load(path: &Path) -> LoadResult<GraspConfig> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse and validate a [`GraspConfig`] from TOML text.
    pub fn parse(content: &str) -> LoadResult<GraspConfig> {
        let config: GraspConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &GraspConfig) -> LoadResult<()> {
        anyhow::ensure!(
            config.max_scan_rate >= 0.0,
            "max_scan_rate must not be negative (got {})",
            config.max_scan_rate
        );
        anyhow::ensure!(
            config.error_wait_delay > 0.0,
            "error_wait_delay must be positive (got {})",
            config.error_wait_delay
        );
        anyhow::ensure!(
            config.failsafe_delay > 0.0,
            "failsafe_delay must be positive (got {})",
            config.failsafe_delay
        );
        for (field, value) in [
            ("max_scan_rate", config.max_scan_rate),
            ("error_wait_delay", config.error_wait_delay),
            ("failsafe_delay", config.failsafe_delay),
        ] {
            anyhow::ensure!(
                value.is_finite() && value <= GraspConfig::MAX_DELAY,
                "{} must be at most {} seconds (got {})",
                field,
                GraspConfig::MAX_DELAY,
                value
            );
        }
        if let Some(scan) = &config.scan_capability {
            anyhow::ensure!(
                !config.persistent.contains(scan),
                "scan capability {} is also listed as persistent",
                scan
            );
        }
        Ok(())
    }
}
