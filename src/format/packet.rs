//! Record layout and classification
//!
//! Every unit on the wire is a fixed 15-byte record:
//!
//! ```text
//! ┌────────┬──────────┬──────────┬──────────┬────────┐
//! │ HEADER │ TS_LSB   │ TS_MSB   │ DATA     │ FOOTER │
//! │ 1 byte │ 4 (LE)   │ 4 (LE)   │ 5 bytes  │ 1 byte │
//! └────────┴──────────┴──────────┴──────────┴────────┘
//! ```
//!
//! Two marker pairs are recognized: `0x99`/`0x66` for encoder records and
//! `0x55`/`0xAA` for IRIG records. Anything else decodes to [`Packet::Unknown`];
//! a corrupt frame never stops the stream.

use serde::{Deserialize, Serialize};

/// Length of one record in bytes.
pub const RECORD_LEN: usize = 15;

/// Header marker of an encoder record.
pub const ENCODER_HEADER: u8 = 0x99;
/// Footer marker of an encoder record.
pub const ENCODER_FOOTER: u8 = 0x66;
/// Header marker of an IRIG record.
pub const IRIG_HEADER: u8 = 0x55;
/// Footer marker of an IRIG record.
pub const IRIG_FOOTER: u8 = 0xAA;

const TS_LSB: std::ops::Range<usize> = 1..5;
const TS_MSB: std::ops::Range<usize> = 5..9;
const DATA: std::ops::Range<usize> = 9..14;
const FOOTER: usize = 14;

/// One raw, aligned record.
pub type RawRecord = [u8; RECORD_LEN];

/// Record classification by marker bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Encoder,
    Irig,
    Unknown,
}

/// A classified record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Encoder reading: combined counter timestamp and 4-byte device state.
    Encoder { timestamp: u64, state: u32 },

    /// IRIG time record. The data bytes are left raw; see [`IrigTime`].
    Irig { timestamp: u64, data: [u8; 5] },

    /// Marker bytes did not match a known record type.
    Unknown,
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Encoder { .. } => PacketKind::Encoder,
            Packet::Irig { .. } => PacketKind::Irig,
            Packet::Unknown => PacketKind::Unknown,
        }
    }

    /// Counter timestamp, if the record was classified.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Packet::Encoder { timestamp, .. } | Packet::Irig { timestamp, .. } => Some(*timestamp),
            Packet::Unknown => None,
        }
    }
}

/// Classify and decode one aligned record.
///
/// Pure: identical bytes always produce an identical result.
pub fn classify(record: &RawRecord) -> Packet {
    let timestamp = combined_timestamp(record);
    match (record[0], record[FOOTER]) {
        (ENCODER_HEADER, ENCODER_FOOTER) => {
            let data = &record[DATA];
            let state = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            Packet::Encoder { timestamp, state }
        }
        (IRIG_HEADER, IRIG_FOOTER) => {
            let mut data = [0u8; 5];
            data.copy_from_slice(&record[DATA]);
            Packet::Irig { timestamp, data }
        }
        _ => Packet::Unknown,
    }
}

/// `ts_lsb + (ts_msb << 32)`
fn combined_timestamp(record: &RawRecord) -> u64 {
    let mut lsb = [0u8; 4];
    let mut msb = [0u8; 4];
    lsb.copy_from_slice(&record[TS_LSB]);
    msb.copy_from_slice(&record[TS_MSB]);
    u64::from(u32::from_le_bytes(lsb)) | (u64::from(u32::from_le_bytes(msb)) << 32)
}

/// Build a record from its fields.
///
/// The timestamp is split into its low and high words.
pub fn encode_record(header: u8, timestamp: u64, data: [u8; 5], footer: u8) -> RawRecord {
    let mut record = [0u8; RECORD_LEN];
    record[0] = header;
    record[TS_LSB].copy_from_slice(&(timestamp as u32).to_le_bytes());
    record[TS_MSB].copy_from_slice(&((timestamp >> 32) as u32).to_le_bytes());
    record[DATA].copy_from_slice(&data);
    record[FOOTER] = footer;
    record
}

/// Build an encoder record carrying `state`.
pub fn encoder_record(timestamp: u64, state: u32) -> RawRecord {
    let s = state.to_le_bytes();
    encode_record(ENCODER_HEADER, timestamp, [s[0], s[1], s[2], s[3], 0x00], ENCODER_FOOTER)
}

/// IRIG time-of-year fields as laid out in the IRIG record data bytes:
/// `[SEC][MIN][HOUR][DAY 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrigTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day: u16,
}

impl IrigTime {
    pub fn from_data(data: &[u8; 5]) -> Self {
        Self {
            seconds: data[0],
            minutes: data[1],
            hours: data[2],
            day: u16::from_le_bytes([data[3], data[4]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_encoder_record_decodes_to_zero() {
        let mut record = [0u8; RECORD_LEN];
        record[0] = 0x99;
        record[14] = 0x66;
        assert_eq!(classify(&record), Packet::Encoder { timestamp: 0, state: 0 });
    }

    #[test]
    fn timestamp_combines_low_and_high_words() {
        let mut record = [0u8; RECORD_LEN];
        record[0] = ENCODER_HEADER;
        record[1..5].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        record[5..9].copy_from_slice(&0x0000_0002u32.to_le_bytes());
        record[9..13].copy_from_slice(&7u32.to_le_bytes());
        record[14] = ENCODER_FOOTER;

        let packet = classify(&record);
        assert_eq!(packet, Packet::Encoder { timestamp: 0x2_DEAD_BEEF, state: 7 });
        assert_eq!(packet.kind(), PacketKind::Encoder);
    }

    #[test]
    fn encoder_state_ignores_the_last_data_byte() {
        let record = encode_record(ENCODER_HEADER, 5, [0x01, 0x02, 0x03, 0x04, 0xFF], ENCODER_FOOTER);
        assert_eq!(classify(&record), Packet::Encoder { timestamp: 5, state: 0x0403_0201 });
    }

    #[test]
    fn irig_record_keeps_raw_data() {
        let record = encode_record(IRIG_HEADER, 42, [30, 15, 12, 0x6D, 0x01], IRIG_FOOTER);
        let packet = classify(&record);
        assert_eq!(packet, Packet::Irig { timestamp: 42, data: [30, 15, 12, 0x6D, 0x01] });

        let Packet::Irig { data, .. } = packet else { unreachable!() };
        let time = IrigTime::from_data(&data);
        assert_eq!(time, IrigTime { seconds: 30, minutes: 15, hours: 12, day: 365 });
    }

    #[test]
    fn mismatched_markers_are_unknown() {
        // Encoder header with IRIG footer, and the reverse
        let a = encode_record(ENCODER_HEADER, 1, [0; 5], IRIG_FOOTER);
        let b = encode_record(IRIG_HEADER, 1, [0; 5], ENCODER_FOOTER);
        assert_eq!(classify(&a), Packet::Unknown);
        assert_eq!(classify(&b), Packet::Unknown);
        assert_eq!(classify(&[0u8; RECORD_LEN]).timestamp(), None);
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(record in any::<[u8; RECORD_LEN]>()) {
            prop_assert_eq!(classify(&record), classify(&record));

            let expected = match (record[0], record[14]) {
                (0x99, 0x66) => PacketKind::Encoder,
                (0x55, 0xAA) => PacketKind::Irig,
                _ => PacketKind::Unknown,
            };
            prop_assert_eq!(classify(&record).kind(), expected);
        }

        #[test]
        fn prop_encoder_fields_survive_encoding(timestamp in any::<u64>(), state in any::<u32>()) {
            let packet = classify(&encoder_record(timestamp, state));
            prop_assert_eq!(packet, Packet::Encoder { timestamp, state });
        }
    }
}
