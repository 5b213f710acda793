//! Exact-count capture to a single file
//!
//! Bulk capture writes a header and then exactly `record_count` records worth
//! of raw bytes to one caller-chosen path. Nothing is decoded and no rotation
//! takes place.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::format::{FileHeader, RECORD_LEN};
use crate::source::ByteSource;
use crate::storage::FileSession;
use crate::{CaptureError, Result};

/// Outcome of a bulk capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCaptureSummary {
    pub path: PathBuf,
    pub records_requested: u64,
    pub bytes_written: u64,
    /// False when the capture was cancelled before completing
    pub complete: bool,
}

impl BulkCaptureSummary {
    /// Body bytes a complete capture holds, saturating on absurd counts.
    pub fn expected_bytes(&self) -> u64 {
        expected_bytes(self.records_requested)
    }
}

fn expected_bytes(record_count: u64) -> u64 {
    record_count.saturating_mul(RECORD_LEN as u64)
}

/// Capture exactly `record_count` records from `source` into `path`.
///
/// Each read asks for no more than the bytes still missing, so the source is
/// never read past the requested count. Fails with
/// [`CaptureError::NotConnected`] before touching the filesystem if the source
/// has no stream, and with [`CaptureError::UnexpectedEof`] if the peer closes
/// early. The file is closed on every exit path.
pub async fn bulk_capture<S: ByteSource + ?Sized>(
    source: &mut S,
    path: impl AsRef<Path>,
    record_count: u64,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<BulkCaptureSummary> {
    if !source.is_connected() {
        return Err(CaptureError::NotConnected);
    }
    if chunk_size == 0 {
        return Err(CaptureError::invalid_config("chunk_size", "must be non-zero"));
    }

    let path = path.as_ref();
    let expected = expected_bytes(record_count);
    let mut session = FileSession::open(path, record_count, &FileHeader::now())?;
    info!("Capturing {} records to {}", record_count, path.display());

    let mut complete = true;
    while !session.is_exhausted() {
        let want = usize::try_from(session.remaining_bytes()).unwrap_or(usize::MAX).min(chunk_size);

        let read = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Capture cancelled after {} bytes", session.bytes_written());
                complete = false;
                break;
            }
            read = source.read_chunk(want) => read,
        };

        match read {
            Ok(Some(chunk)) => {
                session.append(&chunk)?;
            }
            Ok(None) => {
                let received = session.bytes_written();
                session.close()?;
                return Err(CaptureError::UnexpectedEof { expected, received });
            }
            Err(e) => {
                session.close()?;
                return Err(e);
            }
        }
    }

    session.close()?;
    let bytes_written = session.bytes_written();
    info!("Wrote {} bytes to {}", bytes_written, path.display());

    Ok(BulkCaptureSummary {
        path: path.to_path_buf(),
        records_requested: record_count,
        bytes_written,
        complete,
    })
}
