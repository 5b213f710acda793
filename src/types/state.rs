//! Decoded state exposed to callers

use serde::{Deserialize, Serialize};

use crate::format::{Packet, PacketKind};

/// Latest values decoded from encoder records.
///
/// Both fields start at zero and are overwritten by every encoder record.
/// IRIG records never touch them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderState {
    /// Combined counter timestamp of the last encoder record
    pub timestamp: u64,
    /// Device state word of the last encoder record
    pub state: u32,
}

impl DecoderState {
    /// Apply one decoded packet. Returns true if the state was overwritten.
    pub fn apply(&mut self, packet: &Packet) -> bool {
        match *packet {
            Packet::Encoder { timestamp, state } => {
                self.timestamp = timestamp;
                self.state = state;
                true
            }
            Packet::Irig { .. } | Packet::Unknown => false,
        }
    }
}

/// Per-kind counts of decoded records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounters {
    pub encoder: u64,
    pub irig: u64,
    pub unknown: u64,
}

impl RecordCounters {
    pub fn count(&mut self, kind: PacketKind) {
        match kind {
            PacketKind::Encoder => self.encoder += 1,
            PacketKind::Irig => self.irig += 1,
            PacketKind::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.encoder + self.irig + self.unknown
    }
}
