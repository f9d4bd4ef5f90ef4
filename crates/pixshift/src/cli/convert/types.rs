//! CLI enum types for the convert command.

use clap::ValueEnum;
use pixshift_core::OutputFormat as CoreOutputFormat;

/// Report file formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON array, written when the run finishes
    Json,
    /// One JSON object per line, streamed as results arrive
    #[default]
    Jsonl,
}

impl From<ReportFormat> for CoreOutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => CoreOutputFormat::Json,
            ReportFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}
