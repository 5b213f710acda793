//! Re-synchronization of a chunked byte stream into whole records
//!
//! TCP delivers bytes with no regard for record boundaries. [`CarryOver`] keeps
//! the tail of the previous read so that records split across reads are
//! reassembled before decoding.

use super::packet::{RECORD_LEN, RawRecord};

/// Bytes left over between reads.
///
/// Holds fewer than [`RECORD_LEN`] bytes between calls to [`CarryOver::absorb`].
#[derive(Debug, Default, Clone)]
pub struct CarryOver {
    pending: Vec<u8>,
}

impl CarryOver {
    pub fn new() -> Self {
        Self { pending: Vec::with_capacity(RECORD_LEN) }
    }

    /// Append `chunk` to the retained bytes and take every complete record.
    ///
    /// Records are returned oldest first. `len(before) + chunk.len()` always
    /// equals `15 * records + len(after)`.
    pub fn absorb(&mut self, chunk: &[u8]) -> Vec<RawRecord> {
        self.pending.extend_from_slice(chunk);

        let whole = self.pending.len() / RECORD_LEN * RECORD_LEN;
        let records = self.pending[..whole]
            .chunks_exact(RECORD_LEN)
            .map(|bytes| {
                let mut record = [0u8; RECORD_LEN];
                record.copy_from_slice(bytes);
                record
            })
            .collect();

        self.pending.drain(..whole);
        records
    }

    /// Bytes waiting for the rest of their record.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
