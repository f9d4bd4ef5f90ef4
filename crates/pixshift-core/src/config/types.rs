//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

use crate::format::TargetFormat;
use crate::types::DEFAULT_QUALITY;

/// Per-run conversion defaults. CLI flags override these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Default target format name (e.g. "webp"); the CLI requires one if unset
    pub format: Option<String>,

    /// Encoder quality for formats that support it (1-100)
    pub quality: u8,

    /// Descend into subdirectories of the input root
    pub recursive: bool,

    /// Recreate the input directory structure under the output root
    pub mirror: bool,

    /// Output directory (supports `~`)
    pub output_dir: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: None,
            quality: DEFAULT_QUALITY,
            recursive: false,
            mirror: false,
            output_dir: "converted".to_string(),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel workers; unset means twice the available CPUs
    pub parallel_workers: Option<usize>,

    /// Candidates scheduled per wave before the pool drains
    pub wave_size: usize,

    /// Input extensions to accept; unset means every known target format
    pub supported_extensions: Option<Vec<String>>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: None,
            wave_size: 1024,
            supported_extensions: None,
        }
    }
}

impl ProcessingConfig {
    /// Resolved worker count.
    pub fn workers(&self) -> usize {
        self.parallel_workers.unwrap_or_else(default_workers)
    }

    /// Resolved, lowercased list of accepted input extensions.
    pub fn extensions(&self) -> Vec<String> {
        match &self.supported_extensions {
            Some(exts) => exts
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            None => TargetFormat::recognized_extensions()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Twice the number of available CPUs, at least 2.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

/// Pipeline settings for backpressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max results buffered between workers and the aggregator
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-file conversion timeout in milliseconds; unset disables it
    pub task_timeout_ms: Option<u64>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
