//! Reporter boundary: per-result and summary events leave the pipeline here.

use crate::types::{ConversionResult, StatsSummary};

/// Receives pipeline events.
///
/// Events are delivered from a single consumer, one at a time, in completion
/// order.
pub trait Reporter: Send + Sync {
    /// Called once before any task is scheduled.
    fn on_start(&self, _total: u64) {}

    /// Called once per completed task.
    fn on_result(&self, result: &ConversionResult);

    /// Called once after every result has been delivered.
    fn on_summary(&self, summary: &StatsSummary);
}

/// Reports events as structured `tracing` logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_start(&self, total: u64) {
        tracing::info!("Found {} image(s) to convert", total);
    }

    fn on_result(&self, result: &ConversionResult) {
        match &result.output_path {
            Some(output) if result.success => {
                tracing::info!(
                    input = %result.input_path.display(),
                    output = %output.display(),
                    "Converted"
                );
            }
            _ => {
                tracing::error!(
                    input = %result.input_path.display(),
                    error = %result.error,
                    "Failed"
                );
            }
        }
    }

    fn on_summary(&self, summary: &StatsSummary) {
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Conversion finished"
        );
    }
}

/// Fans events out to several reporters in order.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for MultiReporter {
    fn on_start(&self, total: u64) {
        for reporter in &self.reporters {
            reporter.on_start(total);
        }
    }

    fn on_result(&self, result: &ConversionResult) {
        for reporter in &self.reporters {
            reporter.on_result(result);
        }
    }

    fn on_summary(&self, summary: &StatsSummary) {
        for reporter in &self.reporters {
            reporter.on_summary(summary);
        }
    }
}
