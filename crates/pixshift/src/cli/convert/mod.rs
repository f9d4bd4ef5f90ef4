//! The `pixshift convert` command.

mod progress;
pub mod types;

pub use types::ReportFormat;

use anyhow::Context;
use clap::Args;
use pixshift_core::{
    BatchConverter, Config, ConversionRequest, MultiReporter, RecordReporter, Reporter,
    TargetFormat, TracingReporter,
};
use std::fs::File;
use std::io::{BufWriter, IsTerminal};
use std::path::PathBuf;

use progress::ProgressReporter;

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image file or directory to convert
    #[arg(required = true)]
    pub input: PathBuf,

    /// Target format (png, jpeg, gif, bmp, webp, tiff, ico, ppm, heic)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Output directory (defaults to `conversion.output_dir`, "converted")
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encoder quality for lossy formats, 1-100 (defaults to 85)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Recreate the input directory layout under the output directory
    #[arg(short, long)]
    pub mirror: bool,

    /// Number of parallel workers (defaults to twice the CPU count)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Files scheduled per wave
    #[arg(long)]
    pub wave_size: Option<usize>,

    /// Give up on a single file after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write every result plus the summary to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report file format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub report_format: ReportFormat,

    /// Exit with an error if any file failed to convert
    #[arg(long)]
    pub strict: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Manual Default impl for constructing ConvertArgs outside of clap.
///
/// Values match the clap defaults above.
impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            format: None,
            output: None,
            quality: None,
            recursive: false,
            mirror: false,
            parallel: None,
            wave_size: None,
            timeout_ms: None,
            report: None,
            report_format: ReportFormat::Jsonl,
            strict: false,
            no_progress: false,
        }
    }
}

/// Config and request after applying CLI overrides.
#[derive(Debug)]
struct ConvertSettings {
    config: Config,
    request: ConversionRequest,
    output: PathBuf,
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs, config: Config) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let settings = resolve_settings(&args, config)?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let reporter = build_reporter(&args, &settings)?;
    let converter = BatchConverter::new(settings.config);
    let summary = converter
        .run(&args.input, &settings.output, &settings.request, &reporter)
        .await?;

    if summary.total == 0 {
        tracing::warn!("No supported image files found at {:?}", args.input);
    }
    if let Some(report) = &args.report {
        tracing::info!("Report written to {:?}", report);
    }
    if args.strict && summary.failed > 0 {
        anyhow::bail!(
            "{} of {} file(s) failed to convert",
            summary.failed,
            summary.total
        );
    }

    Ok(())
}

/// Merge CLI flags over the loaded config and build the conversion request.
fn resolve_settings(args: &ConvertArgs, mut config: Config) -> anyhow::Result<ConvertSettings> {
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = Some(parallel);
    }
    if let Some(wave_size) = args.wave_size {
        if wave_size == 0 {
            anyhow::bail!("--wave-size must be at least 1");
        }
        config.processing.wave_size = wave_size;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be at least 1");
        }
        config.limits.task_timeout_ms = Some(timeout_ms);
    }

    let format_name = args
        .format
        .clone()
        .or_else(|| config.conversion.format.clone())
        .context(
            "No target format given.\n\n  \
             Hint: Pass --format <FORMAT> or set conversion.format in the config file. \
             Run `pixshift formats` to list formats.",
        )?;
    let format: TargetFormat = format_name.parse()?;

    let quality = args.quality.unwrap_or(config.conversion.quality);
    if args.quality.is_some() && !format.supports_quality() {
        tracing::warn!("{} ignores --quality", format);
    }

    let request = ConversionRequest::new(
        format,
        quality,
        args.recursive || config.conversion.recursive,
        args.mirror || config.conversion.mirror,
    )?;
    let output = args.output.clone().unwrap_or_else(|| config.output_dir());

    Ok(ConvertSettings {
        config,
        request,
        output,
    })
}

/// Assemble the reporters for this run: progress, logs and an optional report file.
fn build_reporter(args: &ConvertArgs, settings: &ConvertSettings) -> anyhow::Result<MultiReporter> {
    let show_progress = !args.no_progress && std::io::stderr().is_terminal();
    let mut reporters: Vec<Box<dyn Reporter>> = vec![
        Box::new(ProgressReporter::new(&settings.output, show_progress)),
        Box::new(TracingReporter),
    ];

    if let Some(path) = &args.report {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file {:?}", path))?;
        reporters.push(Box::new(RecordReporter::new(
            BufWriter::new(file),
            args.report_format.into(),
            false,
        )));
    }

    Ok(MultiReporter::new(reporters))
}
