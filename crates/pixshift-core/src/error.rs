//! Error types for the pixshift conversion pipeline.
//!
//! Errors are split by scope. Run-level errors ([`ConfigError`],
//! [`DiscoveryError`]) abort before any file is scheduled. Per-file errors
//! ([`PathError`], [`CodecError`]) are folded into a failed
//! [`ConversionResult`](crate::types::ConversionResult) and never stop the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for pixshift operations.
#[derive(Error, Debug)]
pub enum PixshiftError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input root could not be discovered
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Target format name is not one of the known formats
    #[error("Unknown target format '{0}' (expected one of: {1})")]
    UnknownFormat(String, String),

    /// Quality outside the accepted 1-100 range
    #[error("Quality {0} is out of range (expected 1-100)")]
    QualityOutOfRange(u8),
}

/// Failure to enumerate the input root.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The input root does not exist
    #[error("Input path does not exist: {0}")]
    NotFound(PathBuf),

    /// The input root exists but is neither a regular file nor a directory
    #[error("Input path is neither a file nor a directory: {0}")]
    NotFileOrDirectory(PathBuf),
}

/// Output path computation failures, scoped to one file.
#[derive(Error, Debug)]
pub enum PathError {
    /// Mirror mode was requested for a file that is not under the input root
    #[error("{path} is not inside input root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// The destination directory could not be created
    #[error("Cannot create output directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input path has no file stem to derive an output name from
    #[error("Cannot derive an output name from {0}")]
    NoFileStem(PathBuf),

    /// Another candidate in the same run already maps to this output path
    #[error("Output {output} for {path} is already claimed by {other}")]
    Collision {
        path: PathBuf,
        other: PathBuf,
        output: PathBuf,
    },
}

/// Open/decode/encode/write failures, scoped to one file.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The input could not be opened or decoded
    #[error("Cannot open {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// Encoding into the target format failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Writing the encoded output failed
    #[error("Write error for {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// The codec has no encoder for the requested format
    #[error("No encoder available for {format} ({path})")]
    Unsupported { path: PathBuf, format: String },

    /// The conversion did not finish within the configured limit
    #[error("Conversion of {path} timed out after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    /// The worker running the conversion died before producing a result
    #[error("Worker failed while converting {path}: {message}")]
    Worker { path: PathBuf, message: String },
}

/// Convenience type alias for pixshift results.
pub type Result<T> = std::result::Result<T, PixshiftError>;

/// Convenience type alias for codec results.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
