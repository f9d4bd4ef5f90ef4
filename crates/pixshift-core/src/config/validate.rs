//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::format::TargetFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(format) = &self.conversion.format {
            format.parse::<TargetFormat>()?;
        }
        if !(1..=100).contains(&self.conversion.quality) {
            return Err(ConfigError::ValidationError(
                "conversion.quality must be between 1 and 100".into(),
            ));
        }
        if self.conversion.output_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversion.output_dir must not be empty".into(),
            ));
        }
        if self.processing.parallel_workers == Some(0) {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.wave_size == 0 {
            return Err(ConfigError::ValidationError(
                "processing.wave_size must be > 0".into(),
            ));
        }
        if matches!(&self.processing.supported_extensions, Some(exts) if exts.is_empty()) {
            return Err(ConfigError::ValidationError(
                "processing.supported_extensions must not be empty".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.limits.task_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "limits.task_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
