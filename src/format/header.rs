//! Fixed-size file header
//!
//! Every capture file starts with a 256-byte preamble:
//!
//! | Offset | Size | Field                                         |
//! |--------|------|-----------------------------------------------|
//! | 0      | 4    | ASCII length tag `b"256\n"`                   |
//! | 4      | 4    | Recorder version (LE u32)                     |
//! | 8      | 4    | Capture start, Unix seconds (LE u32)          |
//! | 12     | 4    | Capture start, microseconds (LE u32)          |
//! | 16     | ..   | Format description text                       |
//! | ..     | ..   | Space padding up to 256 bytes                 |

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::{CaptureError, Result};

/// Total header size in bytes.
pub const HEADER_LEN: usize = 256;

/// Length tag written at offset 0.
pub const LENGTH_TAG: &[u8; 4] = b"256\n";

/// Recorder version stamped into each header.
pub const VERSION: u32 = 2021080501;

const FIXED_FIELDS_LEN: usize = 16;

/// Format description embedded in every header.
pub const DESCRIPTION: &[u8] = b"Stimulator encoder data
Packet format: [HEADER 1][TS_LSB 4][TS_MSB 4][DATA 5][FOOTER 1]
\tIRIG: HEADER=0x55 FOOTER=0xAA
\t\tDATA=[SEC][MIN][HOUR][DAY 2]
\tENC : HEADER=0x99 FOOTER=0x66
\t\tDATA=[STATE 4][0x00]
";

/// Header fields of one capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub start_secs: u32,
    pub start_micros: u32,
    pub description: Vec<u8>,
}

impl FileHeader {
    /// Header stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Header stamped with `time`.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            version: VERSION,
            start_secs: time.timestamp() as u32,
            start_micros: time.timestamp_subsec_micros(),
            description: DESCRIPTION.to_vec(),
        }
    }

    /// Replace the description text.
    pub fn with_description(mut self, description: impl Into<Vec<u8>>) -> Self {
        self.description = description.into();
        self
    }

    /// Serialize to exactly [`HEADER_LEN`] bytes.
    ///
    /// Fails with [`CaptureError::HeaderTooLarge`] when the fixed fields plus the
    /// description do not fit.
    pub fn encode(&self) -> Result<[u8; HEADER_LEN]> {
        let len = FIXED_FIELDS_LEN + self.description.len();
        if len > HEADER_LEN {
            return Err(CaptureError::HeaderTooLarge { len, max: HEADER_LEN });
        }

        let mut out = [b' '; HEADER_LEN];
        out[0..4].copy_from_slice(LENGTH_TAG);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.start_secs.to_le_bytes());
        out[12..16].copy_from_slice(&self.start_micros.to_le_bytes());
        out[FIXED_FIELDS_LEN..len].copy_from_slice(&self.description);

        trace!(padding = HEADER_LEN - len, "Encoded file header");
        Ok(out)
    }

    /// Parse a header from the first [`HEADER_LEN`] bytes of a capture file.
    ///
    /// Trailing space padding is stripped from the description.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CaptureError::parse_error(
                "File header",
                format!("need {} bytes, have {}", HEADER_LEN, bytes.len()),
            ));
        }
        if &bytes[0..4] != LENGTH_TAG {
            return Err(CaptureError::parse_error(
                "File header",
                format!("bad length tag {:?}", &bytes[0..4]),
            ));
        }

        let version = parse_u32_le(bytes, 4);
        if version != VERSION {
            return Err(CaptureError::parse_error(
                "File header",
                format!("unsupported version {version}, expected {VERSION}"),
            ));
        }

        let text = &bytes[FIXED_FIELDS_LEN..HEADER_LEN];
        let end = text.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);

        Ok(Self {
            version,
            start_secs: parse_u32_le(bytes, 8),
            start_micros: parse_u32_le(bytes, 12),
            description: text[..end].to_vec(),
        })
    }

    /// Capture start time, if representable.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.start_secs), self.start_micros * 1_000)
    }
}

fn parse_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
