//! Reader for capture files produced by the recorder
//!
//! ```rust,no_run
//! use stm_enc::format::CaptureReader;
//!
//! fn dump() -> stm_enc::Result<()> {
//!     let mut reader = CaptureReader::open("el_2021-0805-010203+0000.dat")?;
//!     println!("{} records", reader.record_count());
//!     while let Some(packet) = reader.read_next_record() {
//!         println!("{:?}", packet);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The whole file is loaded at construction.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::header::{FileHeader, HEADER_LEN};
use super::packet::{Packet, RECORD_LEN, RawRecord, classify};
use crate::{CaptureError, Result};

/// Sequential reader over the records of one capture file.
pub struct CaptureReader {
    data: Vec<u8>,
    path: PathBuf,
    header: FileHeader,
    current_record: usize,
    total_records: usize,
}

impl CaptureReader {
    /// Open a capture file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| CaptureError::file_error(path, e))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| CaptureError::file_error(path, e))?;

        Self::from_bytes_with_path(data, path.to_path_buf())
    }

    /// Create a reader over in-memory bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_path(data.to_vec(), PathBuf::from("<memory>"))
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        let header = FileHeader::parse(&data)?;

        let body = data.len() - HEADER_LEN;
        let total_records = body / RECORD_LEN;
        if body % RECORD_LEN != 0 {
            warn!(
                "{}: {} trailing bytes after {} whole records",
                path.display(),
                body % RECORD_LEN,
                total_records
            );
        }

        debug!("Opened capture file {} ({} records)", path.display(), total_records);

        Ok(Self { data, path, header, current_record: 0, total_records })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Number of whole records after the header
    pub fn record_count(&self) -> usize {
        self.total_records
    }

    /// Bytes after the last whole record (non-zero only for interrupted captures)
    pub fn trailing_bytes(&self) -> usize {
        (self.data.len() - HEADER_LEN) % RECORD_LEN
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Raw bytes of record `index`
    pub fn raw_record(&self, index: usize) -> Option<RawRecord> {
        if index >= self.total_records {
            return None;
        }
        let start = HEADER_LEN + index * RECORD_LEN;
        let mut record = [0u8; RECORD_LEN];
        record.copy_from_slice(&self.data[start..start + RECORD_LEN]);
        Some(record)
    }

    /// Decode the next record, or `None` at the end of the file
    pub fn read_next_record(&mut self) -> Option<Packet> {
        let record = self.raw_record(self.current_record)?;
        self.current_record += 1;
        Some(classify(&record))
    }

    /// Rewind to the first record
    pub fn rewind(&mut self) {
        self.current_record = 0;
    }

    /// Iterate over every record from the start
    pub fn records(&self) -> impl Iterator<Item = Packet> + '_ {
        (0..self.total_records).filter_map(|i| self.raw_record(i)).map(|r| classify(&r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::packet::{IRIG_FOOTER, IRIG_HEADER, encode_record, encoder_record};

    fn capture_bytes(records: &[RawRecord], tail: &[u8]) -> Vec<u8> {
        let mut bytes = FileHeader::now().encode().unwrap().to_vec();
        for record in records {
            bytes.extend_from_slice(record);
        }
        bytes.extend_from_slice(tail);
        bytes
    }

    #[test]
    fn reads_records_in_order() {
        let bytes = capture_bytes(
            &[
                encoder_record(10, 1),
                encode_record(IRIG_HEADER, 11, [1, 2, 3, 4, 0], IRIG_FOOTER),
                [0u8; RECORD_LEN],
            ],
            &[],
        );
        let mut reader = CaptureReader::from_bytes(&bytes).unwrap();

        assert_eq!(reader.record_count(), 3);
        assert_eq!(reader.read_next_record(), Some(Packet::Encoder { timestamp: 10, state: 1 }));
        assert_eq!(reader.read_next_record().map(|p| p.timestamp()), Some(Some(11)));
        assert_eq!(reader.read_next_record(), Some(Packet::Unknown));
        assert_eq!(reader.read_next_record(), None);

        reader.rewind();
        assert_eq!(reader.records().count(), 3);
    }

    #[test]
    fn interrupted_capture_reports_trailing_bytes() {
        let bytes = capture_bytes(&[encoder_record(1, 0)], &[0x99, 0x00]);
        let reader = CaptureReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.record_count(), 1);
        assert_eq!(reader.trailing_bytes(), 2);
    }

    #[test]
    fn header_only_file_has_no_records() {
        let bytes = capture_bytes(&[], &[]);
        let reader = CaptureReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.record_count(), 0);
        assert!(reader.raw_record(0).is_none());
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CaptureReader::open(dir.path().join("absent.dat"));
        assert!(matches!(result, Err(CaptureError::File { .. })));
    }
}
