//! Wire and file formats
//!
//! - [`packet`]: the 15-byte record and its classification
//! - [`carry_over`]: reassembly of records split across reads
//! - [`header`]: the 256-byte capture file preamble
//! - [`reader`]: reading finished capture files back

pub mod carry_over;
pub mod header;
pub mod packet;
pub mod reader;

pub use carry_over::CarryOver;
pub use header::{FileHeader, HEADER_LEN};
pub use packet::{IrigTime, Packet, PacketKind, RECORD_LEN, RawRecord, classify};
pub use reader::CaptureReader;
