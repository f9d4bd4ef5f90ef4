//! Conversion pipeline components.
//!
//! - **discovery**: Find candidate images under an input root
//! - **paths**: Map an input file to its output path
//! - **codec**: Decode, flatten and encode through the `image` crate
//! - **task**: Convert one file and publish the output atomically
//! - **pool**: Bounded worker pool with per-task timeouts
//! - **stats**: Concurrent run counters
//! - **processor**: Orchestrates a whole batch

pub mod codec;
pub mod discovery;
pub mod paths;
pub mod pool;
pub mod processor;
pub mod stats;
pub mod task;

// Re-exports for convenient access
pub use codec::{DecodedImage, EncodeParams, ImageCodec, ImageRsCodec};
pub use discovery::FileDiscovery;
pub use paths::PathResolver;
pub use pool::{bounded_channel, PoolOptions, WorkerPool};
pub use processor::BatchConverter;
pub use stats::{ConversionStats, StatsAggregator};
pub use task::{AbandonFlag, ConversionTask};
