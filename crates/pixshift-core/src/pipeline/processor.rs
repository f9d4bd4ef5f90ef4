//! Batch orchestration: discover, schedule, aggregate, report.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{PathError, Result};
use crate::report::Reporter;
use crate::types::{ConversionRequest, ConversionResult, StatsSummary};

use super::codec::{ImageCodec, ImageRsCodec};
use super::discovery::FileDiscovery;
use super::paths::PathResolver;
use super::pool::{bounded_channel, PoolOptions, WorkerPool};
use super::stats::StatsAggregator;
use super::task::ConversionTask;

/// Converts every candidate under an input root into an output root.
pub struct BatchConverter {
    config: Config,
    codec: Arc<dyn ImageCodec>,
}

impl BatchConverter {
    /// Create a converter backed by the `image` crate codecs.
    pub fn new(config: Config) -> Self {
        Self::with_codec(config, Arc::new(ImageRsCodec))
    }

    /// Create a converter with a custom codec.
    pub fn with_codec(config: Config, codec: Arc<dyn ImageCodec>) -> Self {
        Self { config, codec }
    }

    /// List the candidate files for a run without converting anything.
    pub fn discover(&self, input_root: &Path, request: &ConversionRequest) -> Result<Vec<PathBuf>> {
        let discovery = FileDiscovery::new(&self.config.processing, request.recursive());
        Ok(discovery.discover(input_root)?)
    }

    /// Run one batch conversion.
    ///
    /// Only discovery and output-root creation can fail the run. Every
    /// per-file problem is reported as a failed result and counted in the
    /// returned summary, which always satisfies
    /// `succeeded + failed == total`.
    pub async fn run(
        &self,
        input_root: &Path,
        output_root: &Path,
        request: &ConversionRequest,
        reporter: &dyn Reporter,
    ) -> Result<StatsSummary> {
        let files = self.discover(input_root, request)?;

        let request = if input_root.is_file() {
            request.without_mirror()
        } else {
            request.clone()
        };

        std::fs::create_dir_all(output_root)?;

        let total = files.len() as u64;
        let aggregator = StatsAggregator::new(total);
        reporter.on_start(total);

        tracing::debug!(
            "Converting {} file(s) from {:?} to {:?} as {} (quality {}, mirror {})",
            total,
            input_root,
            output_root,
            request.format(),
            request.quality(),
            request.mirror()
        );

        let resolver = PathResolver::new(output_root, request.format(), request.mirror());
        let (files, collisions) = claim_outputs(&resolver, input_root, files);
        let task = Arc::new(ConversionTask::new(
            self.codec.clone(),
            request,
            resolver,
            input_root,
        ));
        let pool = WorkerPool::new(PoolOptions::from_config(&self.config));
        let (tx, mut rx) = bounded_channel(&self.config.pipeline);

        // The pool ends up owning the only sender, so the consumer ends once
        // every task has reported.
        let producer = async {
            for failure in collisions {
                if tx.send(failure).await.is_err() {
                    break;
                }
            }
            pool.execute(files, task, tx).await;
        };
        let consumer = async {
            while let Some(result) = rx.recv().await {
                aggregator.update(&result);
                reporter.on_result(&result);
            }
        };
        tokio::join!(producer, consumer);

        let summary = aggregator.summary();
        if !summary.is_complete() {
            tracing::warn!(
                "Summary counters disagree: {} succeeded + {} failed != {} total",
                summary.succeeded,
                summary.failed,
                summary.total
            );
        }
        reporter.on_summary(&summary);
        Ok(summary)
    }
}

/// Give every output path to exactly one candidate.
///
/// Candidates arrive sorted, so the first one in path order keeps the output
/// and every later candidate mapping to the same path becomes a failed
/// result. Candidates whose path cannot be computed are left for the task to
/// report.
fn claim_outputs(
    resolver: &PathResolver,
    input_root: &Path,
    files: Vec<PathBuf>,
) -> (Vec<PathBuf>, Vec<ConversionResult>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(files.len());
    let mut scheduled = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();

    for file in files {
        let Ok(output) = resolver.output_path(input_root, &file) else {
            scheduled.push(file);
            continue;
        };
        match claimed.get(&output) {
            Some(other) => {
                tracing::warn!("{:?} and {:?} both map to {:?}", other, file, output);
                collisions.push(ConversionResult::failure(
                    &file,
                    PathError::Collision {
                        path: file.clone(),
                        other: other.clone(),
                        output,
                    },
                ));
            }
            None => {
                claimed.insert(output, file.clone());
                scheduled.push(file);
            }
        }
    }

    (scheduled, collisions)
}
