//! Report output in JSON and JSONL.
//!
//! [`OutputWriter`] serializes records; [`RecordReporter`] plugs it into the
//! pipeline as a [`Reporter`] so every result and the final summary end up in
//! a machine-readable report.

use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::report::Reporter;
use crate::types::{ConversionResult, ReportRecord, StatsSummary};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one line per item.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Write multiple items: a JSON array, or one line each for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct RecordState<W: Write> {
    writer: OutputWriter<W>,
    pending: Vec<ReportRecord>,
}

/// A [`Reporter`] that writes every result plus the summary as report records.
///
/// JSONL streams each record as it arrives; JSON collects them and writes a
/// single array when the summary arrives. Write failures are logged, never
/// propagated into the pipeline.
pub struct RecordReporter<W: Write + Send> {
    state: Mutex<RecordState<W>>,
}

impl<W: Write + Send> RecordReporter<W> {
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            state: Mutex::new(RecordState {
                writer: OutputWriter::new(writer, format, pretty),
                pending: Vec::new(),
            }),
        }
    }

    fn record(&self, record: ReportRecord, finished: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let outcome = match state.writer.format {
            OutputFormat::JsonLines => state.writer.write(&record),
            OutputFormat::Json => {
                state.pending.push(record);
                if finished {
                    let records = std::mem::take(&mut state.pending);
                    state.writer.write_all(&records)
                } else {
                    Ok(())
                }
            }
        };
        let outcome = outcome.and_then(|_| {
            if finished {
                state.writer.flush()
            } else {
                Ok(())
            }
        });
        if let Err(e) = outcome {
            tracing::warn!("Failed to write report record: {e}");
        }
    }

    /// Consume the reporter and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .writer
            .into_inner()
    }
}

impl<W: Write + Send> Reporter for RecordReporter<W> {
    fn on_result(&self, result: &ConversionResult) {
        self.record(ReportRecord::Result(result.clone()), false);
    }

    fn on_summary(&self, summary: &StatsSummary) {
        self.record(ReportRecord::Summary(*summary), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn summary() -> StatsSummary {
        StatsSummary {
            total: 2,
            succeeded: 1,
            failed: 1,
            elapsed: Duration::from_millis(250),
        }
    }

    fn feed<W: Write + Send>(reporter: &RecordReporter<W>) {
        reporter.on_result(&ConversionResult::success(
            Path::new("in/a.png"),
            PathBuf::from("out/a.webp"),
        ));
        reporter.on_result(&ConversionResult::failure(Path::new("in/c.png"), "corrupt"));
        reporter.on_summary(&summary());
    }

    #[test]
    fn test_record_reporter_jsonl_streams_lines() {
        let reporter = RecordReporter::new(Vec::new(), OutputFormat::JsonLines, false);
        feed(&reporter);

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"type\":\"result\""));
        assert!(lines[1].contains("\"error\":\"corrupt\""));
        assert!(lines[2].contains("\"type\":\"summary\""));
    }

    #[test]
    fn test_record_reporter_json_writes_one_array() {
        let reporter = RecordReporter::new(Vec::new(), OutputFormat::Json, true);
        feed(&reporter);

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let records: Vec<ReportRecord> = serde_json::from_str(&output).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[2], ReportRecord::Summary(s) if s.failed == 1));
    }

    #[test]
    fn test_json_reporter_writes_nothing_before_summary() {
        let reporter = RecordReporter::new(Vec::new(), OutputFormat::Json, false);
        reporter.on_result(&ConversionResult::failure(Path::new("x.png"), "bad"));
        assert!(reporter.into_inner().is_empty());
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&[summary(), summary()]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
    }
}
