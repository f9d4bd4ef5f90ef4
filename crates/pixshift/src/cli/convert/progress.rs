//! Terminal progress: a bar while the batch runs and a summary table after.

use indicatif::{ProgressBar, ProgressStyle};
use pixshift_core::{ConversionResult, Reporter, StatsSummary};
use std::path::PathBuf;

/// Drives an `indicatif` progress bar from pipeline events.
pub struct ProgressReporter {
    bar: ProgressBar,
    output_root: PathBuf,
}

impl ProgressReporter {
    pub fn new(output_root: impl Into<PathBuf>, visible: bool) -> Self {
        let bar = if visible {
            create_progress_bar(0)
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            output_root: output_root.into(),
        }
    }
}

impl Reporter for ProgressReporter {
    fn on_start(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn on_result(&self, _result: &ConversionResult) {
        self.bar.inc(1);
        let elapsed = self.bar.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = self.bar.position() as f64 / elapsed;
            self.bar.set_message(format!("{:.1} img/sec", rate));
        }
    }

    fn on_summary(&self, summary: &StatsSummary) {
        self.bar.finish_and_clear();
        eprint!("{}", format_summary(summary, &self.output_root));
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    // The template is a constant, so a parse failure only loses the styling.
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Render the summary table printed after a batch.
pub fn format_summary(summary: &StatsSummary, output_root: &std::path::Path) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("  ====================================\n");
    out.push_str("               Summary\n");
    out.push_str("  ====================================\n");
    out.push_str(&format!("    Converted:    {:>8}\n", summary.succeeded));
    if summary.failed > 0 {
        out.push_str(&format!("    Failed:       {:>8}\n", summary.failed));
    }
    out.push_str("  ------------------------------------\n");
    out.push_str(&format!("    Total:        {:>8}\n", summary.total));
    out.push_str(&format!(
        "    Duration:     {:>7.1}s\n",
        summary.elapsed.as_secs_f64()
    ));
    out.push_str(&format!("    Rate:         {:>7.1} img/sec\n", summary.rate()));
    out.push_str("  ====================================\n");
    out.push_str(&format!("    Output: {}\n", output_root.display()));
    out
}
