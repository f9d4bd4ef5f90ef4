//! Core data types for the conversion pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::format::TargetFormat;

/// Default encoder quality when none is given.
pub const DEFAULT_QUALITY: u8 = 85;

/// Immutable per-run conversion settings, shared by every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    format: TargetFormat,
    quality: u8,
    recursive: bool,
    mirror: bool,
}

impl ConversionRequest {
    /// Build a request, rejecting quality outside 1-100.
    pub fn new(
        format: TargetFormat,
        quality: u8,
        recursive: bool,
        mirror: bool,
    ) -> Result<Self, ConfigError> {
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::QualityOutOfRange(quality));
        }
        Ok(Self {
            format,
            quality,
            recursive,
            mirror,
        })
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn mirror(&self) -> bool {
        self.mirror
    }

    /// Copy of this request with mirroring turned off.
    ///
    /// Single-file inputs always convert flat into the output root.
    pub fn without_mirror(&self) -> Self {
        Self {
            mirror: false,
            ..self.clone()
        }
    }
}

/// Outcome of converting one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Source file
    pub input_path: PathBuf,

    /// Written file, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    pub success: bool,

    /// Human-readable cause, empty on success
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error: String,
}

impl ConversionResult {
    pub fn success(input_path: &Path, output_path: PathBuf) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: Some(output_path),
            success: true,
            error: String::new(),
        }
    }

    pub fn failure(input_path: &Path, error: impl std::fmt::Display) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: None,
            success: false,
            error: error.to_string(),
        }
    }
}

/// Final statistics for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StatsSummary {
    /// Number of candidate files discovered
    pub total: u64,

    /// Files converted successfully
    pub succeeded: u64,

    /// Files that failed
    pub failed: u64,

    /// Wall-clock time since the aggregator was created
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl StatsSummary {
    /// Files completed per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.succeeded + self.failed) as f64 / secs
        } else {
            0.0
        }
    }

    /// True when every file has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.succeeded + self.failed == self.total
    }
}

/// Serialize durations as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Tagged union for report output: one record per file, then the summary.
/// Internally tagged: `{"type":"result",...}` or `{"type":"summary",...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportRecord {
    Result(ConversionResult),
    Summary(StatsSummary),
}
