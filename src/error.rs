//! Error types for stream capture.
//!
//! Every fallible operation in the crate returns [`CaptureError`]. Errors carry
//! structured context (paths, byte counts, reasons) and can be asked whether a
//! retry makes sense.
//!
//! ## Error Categories
//!
//! - **Startup Errors**: destination not writable, filename collision, lock held,
//!   invalid configuration, oversized file header
//! - **Connection Errors**: the byte source could not be reached or is not connected
//! - **Stream Errors**: the peer closed before an exact-count capture completed
//! - **Parse Errors**: a capture file on disk does not match the expected layout
//!
//! Malformed records inside the stream are never errors; they are skipped by the
//! decoder.
//!
//! ```rust
//! use stm_enc::CaptureError;
//!
//! let error = CaptureError::connection_failed("controller unreachable");
//! assert!(error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Failed to connect to encoder controller: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Byte source is not connected")]
    NotConnected,

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filename collision: {path}")]
    PathCollision { path: PathBuf },

    #[error("Path {path} is not usable: {reason}")]
    PathNotWritable { path: PathBuf, reason: String },

    #[error("File header too long: {len} bytes exceeds {max}")]
    HeaderTooLarge { len: usize, max: usize },

    #[error("Locked: {path}")]
    Locked { path: PathBuf },

    #[error("Invalid configuration for {field}: {details}")]
    Config { field: String, details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Stream ended after {received} of {expected} bytes")]
    UnexpectedEof { expected: u64, received: u64 },

    #[error("Ingest task failed: {reason}")]
    Task { reason: String },
}

impl CaptureError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::Connection { .. } => true,
            CaptureError::UnexpectedEof { .. } => true,
            CaptureError::PathCollision { .. } => true,
            CaptureError::NotConnected => false,
            CaptureError::File { .. } => false,
            CaptureError::PathNotWritable { .. } => false,
            CaptureError::HeaderTooLarge { .. } => false,
            CaptureError::Locked { .. } => false,
            CaptureError::Config { .. } => false,
            CaptureError::Parse { .. } => false,
            CaptureError::Task { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CaptureError::Connection { .. } => vec![
                "Check that the encoder controller is powered and on the network",
                "Verify the configured host and port",
                "Check for firewalls between the recorder and the controller",
            ],
            CaptureError::NotConnected => {
                vec!["Connect the byte source before starting a capture"]
            }
            CaptureError::File { .. } => vec![
                "Check that the destination exists and is writable",
                "Ensure sufficient disk space",
                "Check file permissions",
            ],
            CaptureError::PathCollision { .. } => vec![
                "Wait a second so the next timestamped filename differs",
                "Move or remove the existing file",
            ],
            CaptureError::PathNotWritable { .. } => vec![
                "Create the base directory",
                "Grant write access to the recording user",
            ],
            CaptureError::HeaderTooLarge { .. } => {
                vec!["Shorten the header description text and rebuild"]
            }
            CaptureError::Locked { .. } => vec![
                "Check whether another recorder is already running",
                "Remove a stale lock file left by a crashed recorder",
            ],
            CaptureError::Config { .. } => vec![
                "Check command-line options",
                "Use non-zero chunk size and file length",
            ],
            CaptureError::Parse { .. } => vec![
                "Verify the file was produced by this recorder",
                "Check the file is not truncated inside its header",
            ],
            CaptureError::UnexpectedEof { .. } => vec![
                "Check the controller connection",
                "Restart the capture; the partial file is kept",
            ],
            CaptureError::Task { .. } => vec!["Inspect the logs for a panic in the ingest task"],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::File { path: path.into(), source }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        CaptureError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for unusable destination paths.
    pub fn path_not_writable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CaptureError::PathNotWritable { path: path.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(field: impl Into<String>, details: impl Into<String>) -> Self {
        CaptureError::Config { field: field.into(), details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        CaptureError::Parse { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
