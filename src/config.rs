//! Recorder configuration
//!
//! All tunables are carried in one [`CaptureConfig`] value handed to the
//! recorder at construction. Defaults match the deployed controller.
//!
//! ```rust
//! use stm_enc::CaptureConfig;
//!
//! let config = CaptureConfig::default()
//!     .with_peer("10.0.0.5", 7)
//!     .with_file_length(100_000)
//!     .with_base_dir("/data/el_enc");
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::format::RECORD_LEN;
use crate::storage::paths::DEFAULT_PREFIX;
use crate::{CaptureError, Result};

/// Default controller address.
pub const DEFAULT_HOST: &str = "192.168.10.13";
/// Default controller port.
pub const DEFAULT_PORT: u16 = 7;
/// Default read size: 128 records.
pub const DEFAULT_CHUNK_SIZE: usize = 128 * RECORD_LEN;
/// Default number of records per file.
pub const DEFAULT_FILE_LENGTH: u64 = 1_000_000;
/// Default lock file location.
pub const DEFAULT_LOCK_PATH: &str = "./el_enc.lock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Controller host name or address
    pub host: String,
    /// Controller TCP port
    pub port: u16,
    /// Maximum bytes requested per read
    pub chunk_size: usize,
    /// Records per file before rotating
    pub file_length: u64,
    /// Root of the dated directory tree
    pub base_dir: PathBuf,
    /// Lock file guarding against a second recorder; `None` disables locking
    pub lock_path: Option<PathBuf>,
    /// Filename prefix before the timestamp
    pub file_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_length: DEFAULT_FILE_LENGTH,
            base_dir: PathBuf::from("."),
            lock_path: Some(PathBuf::from(DEFAULT_LOCK_PATH)),
            file_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn with_peer(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_file_length(mut self, file_length: u64) -> Self {
        self.file_length = file_length;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_lock_path(mut self, lock_path: Option<PathBuf>) -> Self {
        self.lock_path = lock_path;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// `host:port` for logging and connecting.
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(CaptureError::invalid_config("host", "must not be empty"));
        }
        if self.chunk_size == 0 {
            return Err(CaptureError::invalid_config("chunk_size", "must be non-zero"));
        }
        if self.file_length == 0 {
            return Err(CaptureError::invalid_config("file_length", "must be non-zero"));
        }
        if self.file_length.checked_mul(RECORD_LEN as u64).is_none() {
            return Err(CaptureError::invalid_config("file_length", "byte size overflows"));
        }
        if self.file_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(CaptureError::invalid_config("file_prefix", "must not contain a separator"));
        }
        Ok(())
    }
}
