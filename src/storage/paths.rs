//! Destination naming and directory checks
//!
//! Capture files land in `<base>/<YYYY>/<MM>/<DD>/<prefix>YYYY-MMDD-HHMMSS+0000.dat`
//! with the timestamp taken in UTC when the file is opened.

use chrono::{DateTime, Datelike, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{CaptureError, Result};

/// strftime pattern following the filename prefix.
pub const FILENAME_FORMAT: &str = "%Y-%m%d-%H%M%S+0000.dat";

/// Default filename prefix.
pub const DEFAULT_PREFIX: &str = "el_";

/// Source of paths for new capture files.
///
/// Implementations report an already-existing path as
/// [`CaptureError::PathCollision`] instead of choosing another name.
pub trait PathNamer: Send + 'static {
    fn next_path(&mut self) -> Result<PathBuf>;
}

/// Date-partitioned, timestamped file names under a base directory.
#[derive(Debug, Clone)]
pub struct DatedPathNamer {
    base: PathBuf,
    prefix: String,
}

impl DatedPathNamer {
    pub fn new(base: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self { base: base.into(), prefix: prefix.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of a file opened at `time`.
    pub fn path_for(&self, time: DateTime<Utc>) -> PathBuf {
        self.base
            .join(format!("{:04}", time.year()))
            .join(format!("{:02}", time.month()))
            .join(format!("{:02}", time.day()))
            .join(format!("{}{}", self.prefix, time.format(FILENAME_FORMAT)))
    }

    /// Build the path for `time`, creating its day directory.
    pub fn create_for(&self, time: DateTime<Utc>) -> Result<PathBuf> {
        let path = self.path_for(time);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| CaptureError::file_error(dir, e))?;
        }
        if path.exists() {
            return Err(CaptureError::PathCollision { path });
        }
        debug!("New capture path {}", path.display());
        Ok(path)
    }
}

impl PathNamer for DatedPathNamer {
    fn next_path(&mut self) -> Result<PathBuf> {
        self.create_for(Utc::now())
    }
}

/// Check that `path` is an existing, writable directory.
pub fn check_writable_dir(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| CaptureError::path_not_writable(path, "does not exist"))?;

    if !metadata.is_dir() {
        return Err(CaptureError::path_not_writable(path, "not a directory"));
    }
    // Permission bits say nothing about the current user; create a file to find out
    tempfile::Builder::new()
        .prefix(".stm-enc-write-check")
        .tempfile_in(path)
        .map_err(|e| CaptureError::path_not_writable(path, format!("no write access: {e}")))?;
    Ok(())
}
