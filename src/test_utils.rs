//! Test utilities: scripted byte sources, deterministic file naming and
//! record-stream builders.
//!
//! Shared by unit tests and the benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::format::packet::encoder_record;
use crate::source::ByteSource;
use crate::storage::PathNamer;
use crate::{CaptureError, Result};

/// Concatenated encoder records whose timestamp and state both equal the index.
pub fn encoder_stream(range: std::ops::Range<u64>) -> Vec<u8> {
    range.flat_map(|i| encoder_record(i, i as u32)).collect()
}

/// Names files `capture_0000.dat`, `capture_0001.dat`, ... inside one directory.
#[derive(Debug, Clone)]
pub struct SequentialNamer {
    dir: PathBuf,
    next: usize,
}

impl SequentialNamer {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), next: 0 }
    }

    /// Path of the `index`-th file.
    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("capture_{index:04}.dat"))
    }
}

impl PathNamer for SequentialNamer {
    fn next_path(&mut self) -> Result<PathBuf> {
        let path = self.path(self.next);
        self.next += 1;
        if path.exists() {
            return Err(CaptureError::PathCollision { path });
        }
        Ok(path)
    }
}

/// In-memory byte source replaying fixed chunks.
///
/// After the script runs out it reports end-of-stream, stays pending forever
/// (`hold_open`), or fails once (`then_fail`).
pub struct ScriptedSource {
    chunks: VecDeque<Vec<u8>>,
    hold_open: bool,
    failure: Option<CaptureError>,
    connected: bool,
}

impl ScriptedSource {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks: chunks.into(), hold_open: false, failure: None, connected: true }
    }

    /// Split `bytes` into chunks of `chunk_len`.
    pub fn from_stream(bytes: &[u8], chunk_len: usize) -> Self {
        Self::new(bytes.chunks(chunk_len).map(<[u8]>::to_vec).collect())
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn then_fail(mut self, error: CaptureError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }
}

#[async_trait::async_trait]
impl ByteSource for ScriptedSource {
    async fn read_chunk(&mut self, max_len: usize) -> Result<Option<Vec<u8>>> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }

        if let Some(mut chunk) = self.chunks.pop_front() {
            if chunk.len() > max_len {
                let rest = chunk.split_off(max_len);
                self.chunks.push_front(rest);
            }
            return Ok(Some(chunk));
        }

        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
