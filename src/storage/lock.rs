//! Single-instance lock file
//!
//! The lock file holds the recorder's PID. It is created with create-new
//! semantics and removed when the [`LockFile`] guard is dropped, so every exit
//! path that unwinds releases it.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::paths::check_writable_dir;
use crate::{CaptureError, Result};

/// Held lock; released on drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Create the lock file at `path`.
    ///
    /// Fails with [`CaptureError::Locked`] if it already exists.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        check_writable_dir(&parent)?;

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                CaptureError::Locked { path: path.clone() }
            } else {
                CaptureError::file_error(&path, e)
            }
        })?;
        writeln!(file, "{}", std::process::id()).map_err(|e| CaptureError::file_error(&path, e))?;

        debug!("Acquired lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) => warn!("Failed to remove lock {}: {}", self.path.display(), e),
        }
    }
}
