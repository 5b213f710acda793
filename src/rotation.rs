//! File rotation and stream decoding
//!
//! [`RotationController`] receives every chunk read from the controller and
//! does two independent things with it:
//!
//! 1. **Persist**: the raw bytes go to the active [`FileSession`]. With no
//!    active session a new one is opened at the next path from the
//!    [`PathNamer`]. A session that reaches its record capacity is closed, and
//!    the next byte opens a fresh file.
//! 2. **Decode**: the same bytes pass through the [`CarryOver`] buffer; every
//!    complete record is classified and encoder records update the
//!    [`DecoderState`].
//!
//! A chunk that crosses the capacity boundary is split there: the head
//! completes the current file and the tail starts the next one, so every
//! finished file holds exactly `file_length` records.

use std::path::Path;
use tracing::{debug, info, trace};

use crate::Result;
use crate::config::CaptureConfig;
use crate::format::{CarryOver, FileHeader, classify};
use crate::storage::{DatedPathNamer, FileSession, PathNamer};
use crate::types::{DecoderState, RecordCounters};

/// Owns the active capture file, the carry-over bytes and the decoded state.
pub struct RotationController<N: PathNamer = DatedPathNamer> {
    namer: N,
    file_length: u64,
    session: Option<FileSession>,
    carry: CarryOver,
    latest: DecoderState,
    counters: RecordCounters,
    files_opened: u64,
    files_completed: u64,
    bytes_ingested: u64,
}

impl RotationController<DatedPathNamer> {
    /// Controller writing dated files under `config.base_dir`.
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        config.validate()?;
        let namer = DatedPathNamer::new(&config.base_dir, &config.file_prefix);
        Ok(Self::with_namer(namer, config.file_length))
    }
}

impl<N: PathNamer> RotationController<N> {
    /// Controller taking file paths from `namer`, rotating every `file_length` records.
    pub fn with_namer(namer: N, file_length: u64) -> Self {
        Self {
            namer,
            file_length,
            session: None,
            carry: CarryOver::new(),
            latest: DecoderState::default(),
            counters: RecordCounters::default(),
            files_opened: 0,
            files_completed: 0,
            bytes_ingested: 0,
        }
    }

    /// Persist and decode one chunk.
    ///
    /// Returns true if the chunk contained at least one encoder record.
    /// File errors are fatal and leave the controller without a session.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<bool> {
        self.bytes_ingested += chunk.len() as u64;
        self.persist(chunk)?;
        Ok(self.decode(chunk))
    }

    fn persist(&mut self, chunk: &[u8]) -> Result<()> {
        let mut rest = chunk;
        while !rest.is_empty() {
            let mut session = match self.session.take() {
                Some(session) => session,
                None => self.open_session()?,
            };

            // On failure the session is dropped here, which closes it
            let written = session.append(rest)?;
            rest = &rest[written..];

            if session.is_exhausted() {
                self.complete(session)?;
            } else {
                self.session = Some(session);
            }
        }
        Ok(())
    }

    fn open_session(&mut self) -> Result<FileSession> {
        let path = self.namer.next_path()?;
        let session = FileSession::open(path, self.file_length, &FileHeader::now())?;
        self.files_opened += 1;
        Ok(session)
    }

    fn complete(&mut self, mut session: FileSession) -> Result<()> {
        session.close()?;
        self.files_completed += 1;
        info!(
            "Completed {} ({} records, file #{})",
            session.path().display(),
            session.records_written(),
            self.files_completed
        );
        Ok(())
    }

    fn decode(&mut self, chunk: &[u8]) -> bool {
        let mut updated = false;
        for record in self.carry.absorb(chunk) {
            let packet = classify(&record);
            trace!(?packet, "Decoded record");
            self.counters.count(packet.kind());
            updated |= self.latest.apply(&packet);
        }
        updated
    }

    /// Snapshot of the latest decoded values.
    pub fn latest(&self) -> DecoderState {
        self.latest
    }

    pub fn counters(&self) -> RecordCounters {
        self.counters
    }

    /// Path of the file currently being written, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(FileSession::path)
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    pub fn files_opened(&self) -> u64 {
        self.files_opened
    }

    /// Files that reached full capacity.
    pub fn files_completed(&self) -> u64 {
        self.files_completed
    }

    pub fn bytes_ingested(&self) -> u64 {
        self.bytes_ingested
    }

    /// Bytes of an incomplete record waiting for the next chunk.
    pub fn pending_bytes(&self) -> usize {
        self.carry.pending_len()
    }

    /// Close the active file, keeping whatever was written.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            debug!(
                "Closing partial file {} ({} records)",
                session.path().display(),
                session.records_written()
            );
            session.close()?;
        }
        Ok(())
    }
}
