//! One open capture file
//!
//! A [`FileSession`] owns the file handle from header to close. Capacity is
//! counted in bytes (`capacity_records * 15`) so that chunks which do not end on
//! a record boundary are still accounted exactly.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::format::{FileHeader, RECORD_LEN};
use crate::{CaptureError, Result};

/// An output file with a fixed record capacity.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    header_written: bool,
    capacity_records: u64,
    remaining_bytes: u64,
}

impl FileSession {
    /// Create `path` and write `header` to it.
    ///
    /// The path must not exist yet: an existing file is reported as
    /// [`CaptureError::PathCollision`] and left untouched.
    pub fn open(path: impl Into<PathBuf>, capacity_records: u64, header: &FileHeader) -> Result<Self> {
        let path = path.into();
        let header_bytes = header.encode()?;

        let file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                CaptureError::PathCollision { path: path.clone() }
            } else {
                CaptureError::file_error(&path, e)
            }
        })?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&header_bytes).map_err(|e| CaptureError::file_error(&path, e))?;
        writer.flush().map_err(|e| CaptureError::file_error(&path, e))?;

        info!("Opened {} ({} records)", path.display(), capacity_records);
        Ok(Self {
            path,
            writer: Some(writer),
            header_written: true,
            capacity_records,
            remaining_bytes: capacity_records.saturating_mul(RECORD_LEN as u64),
        })
    }

    /// Append raw stream bytes, up to the remaining capacity.
    ///
    /// Returns how many bytes of `bytes` were written; the rest belongs to the
    /// next file.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize> {
        let path = &self.path;
        let writer = self.writer.as_mut().ok_or_else(|| {
            CaptureError::file_error(path, std::io::Error::other("session already closed"))
        })?;

        let take = bytes.len().min(usize::try_from(self.remaining_bytes).unwrap_or(usize::MAX));
        writer.write_all(&bytes[..take]).map_err(|e| CaptureError::file_error(path, e))?;
        self.remaining_bytes -= take as u64;
        Ok(take)
    }

    /// True once the file holds its full record capacity.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_bytes == 0
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.remaining_bytes
    }

    /// Whole records that still fit.
    pub fn remaining_records(&self) -> u64 {
        self.remaining_bytes / RECORD_LEN as u64
    }

    /// Whole records written so far.
    pub fn records_written(&self) -> u64 {
        self.bytes_written() / RECORD_LEN as u64
    }

    /// Body bytes written so far, header excluded.
    pub fn bytes_written(&self) -> u64 {
        self.capacity_records.saturating_mul(RECORD_LEN as u64) - self.remaining_bytes
    }

    pub fn capacity_records(&self) -> u64 {
        self.capacity_records
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| CaptureError::file_error(&self.path, e))?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };

        let file = writer.into_inner().map_err(|e| CaptureError::file_error(&self.path, e.into_error()))?;
        file.sync_data().map_err(|e| CaptureError::file_error(&self.path, e))?;

        debug!("Closed {} after {} records", self.path.display(), self.records_written());
        Ok(())
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HEADER_LEN;
    use crate::format::packet::encoder_record;

    #[test]
    fn open_writes_header_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");

        let session = FileSession::open(&path, 10, &FileHeader::now()).unwrap();
        assert!(session.header_written());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_LEN as u64);
        assert_eq!(session.remaining_records(), 10);
    }

    #[test]
    fn existing_path_is_a_collision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");
        std::fs::write(&path, b"keep me").unwrap();

        let result = FileSession::open(&path, 10, &FileHeader::now());
        assert!(matches!(result, Err(CaptureError::PathCollision { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn oversized_header_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");
        let header = FileHeader::now().with_description(vec![b'x'; 300]);

        let result = FileSession::open(&path, 10, &header);
        assert!(matches!(result, Err(CaptureError::HeaderTooLarge { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn append_stops_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");
        let mut session = FileSession::open(&path, 2, &FileHeader::now()).unwrap();

        let record = encoder_record(1, 0);
        assert_eq!(session.append(&record[..10]).unwrap(), 10);
        assert!(!session.is_exhausted());
        assert_eq!(session.records_written(), 0);

        let mut rest = record[10..].to_vec();
        rest.extend_from_slice(&record);
        rest.extend_from_slice(&record);
        assert_eq!(session.append(&rest).unwrap(), 20);
        assert!(session.is_exhausted());
        assert_eq!(session.records_written(), 2);
        assert_eq!(session.append(&record).unwrap(), 0);

        session.close().unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (HEADER_LEN + 2 * RECORD_LEN) as u64);
    }

    #[test]
    fn close_is_idempotent_and_blocks_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = FileSession::open(dir.path().join("a.dat"), 5, &FileHeader::now()).unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(!session.is_open());
        assert!(matches!(session.append(&[0u8; 15]), Err(CaptureError::File { .. })));
    }

    #[test]
    fn drop_flushes_buffered_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");
        {
            let mut session = FileSession::open(&path, 5, &FileHeader::now()).unwrap();
            session.append(&encoder_record(3, 4)).unwrap();
        }
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (HEADER_LEN + RECORD_LEN) as u64);
    }
}
