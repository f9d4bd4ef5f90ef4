//! Bounded worker pool that runs one conversion task per candidate file.
//!
//! A single semaphore bounds concurrency for the whole run. Each task runs the
//! blocking conversion on tokio's blocking pool while it holds a permit, and
//! sends its result over a bounded channel as soon as it completes. Candidates
//! are scheduled in waves so the number of live task handles stays bounded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;

use crate::config::{Config, PipelineConfig};
use crate::error::CodecError;
use crate::types::ConversionResult;

use super::task::{AbandonFlag, ConversionTask};

/// Create a bounded result channel with the configured buffer size.
///
/// When the buffer is full, workers wait before sending, which keeps a slow
/// consumer from being flooded.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size)
}

/// Sizing and limits for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum conversions in flight
    pub workers: usize,
    /// Candidates scheduled per wave
    pub wave_size: usize,
    /// Per-task time limit
    pub task_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::default_workers(),
            wave_size: 1024,
            task_timeout: None,
        }
    }
}

impl PoolOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.processing.workers().max(1),
            wave_size: config.processing.wave_size.max(1),
            task_timeout: config.limits.task_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Runs conversion tasks with bounded parallelism.
pub struct WorkerPool {
    options: PoolOptions,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(options: PoolOptions) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
        Self { options, semaphore }
    }

    /// Convert every file, sending exactly one result per file to `results`.
    ///
    /// Returns once every task has finished and sent its result. A failing or
    /// panicking task produces a failed result and never affects its siblings.
    pub async fn execute(
        &self,
        files: Vec<PathBuf>,
        task: Arc<ConversionTask>,
        results: mpsc::Sender<ConversionResult>,
    ) {
        let waves = files.len().div_ceil(self.options.wave_size.max(1));

        for (index, wave) in files.chunks(self.options.wave_size.max(1)).enumerate() {
            tracing::debug!(
                "Scheduling wave {}/{} ({} file(s), {} worker(s))",
                index + 1,
                waves,
                wave.len(),
                self.options.workers
            );
            let mut handles = Vec::with_capacity(wave.len());

            for path in wave {
                let permit = match self.semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!("Worker pool closed unexpectedly, failing {:?}", path);
                        let failure = ConversionResult::failure(
                            path,
                            CodecError::Worker {
                                path: path.clone(),
                                message: "worker pool closed".to_string(),
                            },
                        );
                        let _ = results.send(failure).await;
                        continue;
                    }
                };

                let task = task.clone();
                let results = results.clone();
                let path = path.clone();
                let timeout = self.options.task_timeout;

                let handle = tokio::spawn(async move {
                    let abandon = AbandonFlag::new();
                    let mut blocking = {
                        let path = path.clone();
                        let abandon = abandon.clone();
                        tokio::task::spawn_blocking(move || {
                            let result = task.convert(&path, &abandon);
                            // Release the worker slot only once the blocking work is done.
                            drop(permit);
                            result
                        })
                    };

                    let result = match timeout {
                        Some(limit) => match tokio::time::timeout(limit, &mut blocking).await {
                            Ok(joined) => joined_result(&path, joined),
                            Err(_) => {
                                abandon.abandon();
                                tracing::warn!("Conversion of {:?} timed out after {:?}", path, limit);
                                // The task may have passed its abandon check
                                // already; anything it publishes is withdrawn.
                                discard_late_output(&path, blocking.await);
                                ConversionResult::failure(
                                    &path,
                                    CodecError::Timeout {
                                        path: path.clone(),
                                        timeout_ms: limit.as_millis() as u64,
                                    },
                                )
                            }
                        },
                        None => joined_result(&path, blocking.await),
                    };

                    if results.send(result).await.is_err() {
                        tracing::warn!("Result receiver closed, dropping result for {:?}", path);
                    }
                });
                handles.push(handle);
            }

            // Drain the wave before scheduling the next one.
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Worker task failed to complete: {e}");
                }
            }
        }
    }
}

/// Remove the output of a task that finished after it was reported as timed out.
fn discard_late_output(path: &Path, late: Result<ConversionResult, JoinError>) {
    let Ok(ConversionResult {
        success: true,
        output_path: Some(output),
        ..
    }) = late
    else {
        return;
    };
    tracing::debug!("Withdrawing late output {:?} for {:?}", output, path);
    if let Err(e) = std::fs::remove_file(&output) {
        tracing::warn!("Failed to remove late output {:?}: {}", output, e);
    }
}

/// Map a finished blocking task to a result, turning a panic into a failure.
fn joined_result(path: &Path, joined: Result<ConversionResult, JoinError>) -> ConversionResult {
    match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Worker panicked while converting {:?}: {e}", path);
            ConversionResult::failure(
                path,
                CodecError::Worker {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecResult;
    use crate::format::TargetFormat;
    use crate::pipeline::codec::{DecodedImage, EncodeParams, ImageCodec};
    use crate::pipeline::paths::PathResolver;
    use crate::types::ConversionRequest;
    use image::DynamicImage;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A codec that fabricates images from file names.
    ///
    /// Names containing "bad" fail to open, "panic" panics, "slow" sleeps.
    /// Tracks peak concurrency across `open` calls.
    #[derive(Default)]
    struct MockCodec {
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
        delay: Option<Duration>,
    }

    impl ImageCodec for MockCodec {
        fn open(&self, path: &Path) -> CodecResult<DecodedImage> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let name = path.to_string_lossy().into_owned();
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if name.contains("slow") {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if name.contains("panic") {
                panic!("codec exploded on {name}");
            }
            if name.contains("bad") {
                return Err(CodecError::Open {
                    path: path.to_path_buf(),
                    message: "corrupt".to_string(),
                });
            }
            Ok(DecodedImage::new(DynamicImage::new_rgb8(2, 2), None))
        }

        fn to_opaque(&self, image: DynamicImage) -> DynamicImage {
            image
        }

        fn save(
            &self,
            _image: &DynamicImage,
            path: &Path,
            _format: TargetFormat,
            _params: &EncodeParams,
        ) -> CodecResult<()> {
            std::fs::write(path, b"ok").map_err(|e| CodecError::Write {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    fn build_task(codec: Arc<MockCodec>, out: &Path) -> Arc<ConversionTask> {
        let request = ConversionRequest::new(TargetFormat::Png, 85, false, false).unwrap();
        let resolver = PathResolver::new(out, TargetFormat::Png, false);
        Arc::new(ConversionTask::new(codec, request, resolver, "/virtual"))
    }

    async fn collect(
        pool: &WorkerPool,
        files: Vec<PathBuf>,
        task: Arc<ConversionTask>,
    ) -> Vec<ConversionResult> {
        let (tx, mut rx) = mpsc::channel(4);
        let consumer = async move {
            let mut results = Vec::new();
            while let Some(result) = rx.recv().await {
                results.push(result);
            }
            results
        };
        let (_, results) = tokio::join!(pool.execute(files, task, tx), consumer);
        results
    }

    fn names(prefix: &str, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("/virtual/{prefix}{i}.png")))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_file_yields_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let codec = Arc::new(MockCodec::default());
        let mut files = names("ok", 40);
        files.extend(names("bad", 10));

        let pool = WorkerPool::new(PoolOptions {
            workers: 3,
            wave_size: 7,
            task_timeout: None,
        });
        let results = collect(&pool, files.clone(), build_task(codec, dir.path())).await;

        assert_eq!(results.len(), files.len());
        let seen: HashSet<_> = results.iter().map(|r| r.input_path.clone()).collect();
        assert_eq!(seen.len(), files.len());
        assert_eq!(results.iter().filter(|r| r.success).count(), 40);
        assert_eq!(results.iter().filter(|r| !r.success).count(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let codec = Arc::new(MockCodec {
            delay: Some(Duration::from_millis(20)),
            ..MockCodec::default()
        });

        let pool = WorkerPool::new(PoolOptions {
            workers: 2,
            wave_size: 100,
            task_timeout: None,
        });
        let results = collect(&pool, names("ok", 12), build_task(codec.clone(), dir.path())).await;

        assert_eq!(results.len(), 12);
        let peak = codec.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak} exceeded 2 workers");
        assert!(peak >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_task_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let codec = Arc::new(MockCodec::default());
        let mut files = names("ok", 5);
        files.push(PathBuf::from("/virtual/panic.png"));

        let pool = WorkerPool::new(PoolOptions {
            workers: 2,
            wave_size: 3,
            task_timeout: None,
        });
        let results = collect(&pool, files, build_task(codec, dir.path())).await;

        assert_eq!(results.len(), 6);
        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].input_path.ends_with("panic.png"));
        assert!(failed[0].error.contains("Worker failed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_task_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let codec = Arc::new(MockCodec::default());
        let files = vec![
            PathBuf::from("/virtual/fast.png"),
            PathBuf::from("/virtual/slow.png"),
        ];

        let pool = WorkerPool::new(PoolOptions {
            workers: 2,
            wave_size: 10,
            task_timeout: Some(Duration::from_millis(50)),
        });
        let results = collect(&pool, files, build_task(codec, dir.path())).await;

        assert_eq!(results.len(), 2);
        let slow = results
            .iter()
            .find(|r| r.input_path.ends_with("slow.png"))
            .unwrap();
        assert!(!slow.success);
        assert!(slow.error.contains("timed out"));

        // The abandoned conversion must not publish its output once it finishes.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!dir.path().join("slow.png").exists());
        assert!(dir.path().join("fast.png").exists());
    }

    #[test]
    fn test_late_success_output_is_withdrawn() {
        let dir = tempfile::tempdir().unwrap();
        let published = dir.path().join("late.png");
        std::fs::write(&published, b"late").unwrap();

        let late = ConversionResult::success(Path::new("in/late.png"), published.clone());
        discard_late_output(Path::new("in/late.png"), Ok(late));
        assert!(!published.exists());
    }

    #[test]
    fn test_late_failure_leaves_directory_alone() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.png");
        std::fs::write(&other, b"keep").unwrap();

        let late = ConversionResult::failure(Path::new("in/late.png"), "abandoned");
        discard_late_output(Path::new("in/late.png"), Ok(late));
        assert!(other.exists());
    }

    #[tokio::test]
    async fn test_wave_size_does_not_change_totals() {
        for wave_size in [1, 2, 5, 64] {
            let dir = tempfile::tempdir().unwrap();
            let codec = Arc::new(MockCodec::default());
            let mut files = names("ok", 9);
            files.extend(names("bad", 4));

            let pool = WorkerPool::new(PoolOptions {
                workers: 3,
                wave_size,
                task_timeout: None,
            });
            let results = collect(&pool, files, build_task(codec, dir.path())).await;
            assert_eq!(results.len(), 13, "wave_size {wave_size}");
            assert_eq!(results.iter().filter(|r| r.success).count(), 9);
        }
    }

    #[tokio::test]
    async fn test_empty_input_finishes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(PoolOptions::default());
        let results = collect(&pool, vec![], build_task(Arc::new(MockCodec::default()), dir.path())).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_channel() {
        let config = PipelineConfig { buffer_size: 10 };
        let (tx, mut rx) = bounded_channel::<i32>(&config);

        tx.send(42).await.unwrap();
        assert_eq!(rx.recv().await, Some(42));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.processing.parallel_workers = Some(5);
        config.processing.wave_size = 32;
        config.limits.task_timeout_ms = Some(1500);

        let options = PoolOptions::from_config(&config);
        assert_eq!(options.workers, 5);
        assert_eq!(options.wave_size, 32);
        assert_eq!(options.task_timeout, Some(Duration::from_millis(1500)));
    }
}
