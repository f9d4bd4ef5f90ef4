//! Run statistics, safe to update from concurrently completing tasks.

use std::sync::Mutex;
use std::time::Instant;

use crate::types::{ConversionResult, StatsSummary};

/// Mutable counters for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Owns the run's [`ConversionStats`] and serializes every update.
#[derive(Debug)]
pub struct StatsAggregator {
    stats: Mutex<ConversionStats>,
    started: Instant,
}

impl StatsAggregator {
    /// Start a run over `total` discovered files.
    pub fn new(total: u64) -> Self {
        Self {
            stats: Mutex::new(ConversionStats {
                total,
                ..ConversionStats::default()
            }),
            started: Instant::now(),
        }
    }

    /// Count one completed task.
    pub fn update(&self, result: &ConversionResult) {
        // A poisoned lock still holds valid counters.
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        if result.success {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
    }

    /// Snapshot of the counters plus elapsed time since creation.
    pub fn summary(&self) -> StatsSummary {
        let stats = *self.stats.lock().unwrap_or_else(|e| e.into_inner());
        StatsSummary {
            total: stats.total,
            succeeded: stats.succeeded,
            failed: stats.failed,
            elapsed: self.started.elapsed(),
        }
    }
}
