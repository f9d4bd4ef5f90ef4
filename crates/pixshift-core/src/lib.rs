//! Pixshift Core - embeddable batch image conversion.
//!
//! Pixshift converts every image under an input root to one target format,
//! in parallel, writing results into an output root either flat or mirroring
//! the input layout.
//!
//! # Architecture
//!
//! ```text
//! Discover → WorkerPool ─┬─ Task (open → flatten → encode → rename) ─┐
//!                        └─ ...                                       ├→ Stats + Reporter
//! ```
//!
//! Per-file failures never abort a run; they are reported and counted.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pixshift_core::{ConversionRequest, TargetFormat, TracingReporter};
//!
//! #[tokio::main]
//! async fn main() -> pixshift_core::Result<()> {
//!     let request = ConversionRequest::new(TargetFormat::Webp, 80, true, true)?;
//!     let summary = pixshift_core::run("./photos", "./converted", &request, &TracingReporter).await?;
//!     println!("{} converted, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod types;

use std::path::Path;

// Re-exports for convenient access
pub use config::Config;
pub use error::{CodecError, ConfigError, DiscoveryError, PathError, PixshiftError, Result};
pub use format::TargetFormat;
pub use output::{OutputFormat, OutputWriter, RecordReporter};
pub use pipeline::{BatchConverter, PoolOptions};
pub use report::{MultiReporter, Reporter, TracingReporter};
pub use types::{ConversionRequest, ConversionResult, ReportRecord, StatsSummary, DEFAULT_QUALITY};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert everything under `input_root` with default configuration.
///
/// See [`BatchConverter::run`] for the failure model.
pub async fn run(
    input_root: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    request: &ConversionRequest,
    reporter: &dyn Reporter,
) -> Result<StatsSummary> {
    BatchConverter::new(Config::default())
        .run(input_root.as_ref(), output_root.as_ref(), request, reporter)
        .await
}
