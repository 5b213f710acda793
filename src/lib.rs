//! Recorder and decoder for the stimulator elevation-encoder telemetry stream.
//!
//! The encoder controller streams fixed 15-byte records over TCP: encoder
//! readings framed by `0x99`/`0x66` and IRIG time records framed by
//! `0x55`/`0xAA`. This crate writes the raw stream verbatim into rotating,
//! dated `.dat` files with a 256-byte header, and decodes the same bytes on the
//! fly so callers always see the latest timestamp and encoder state.
//!
//! # Features
//!
//! - **Rotating capture**: fixed-capacity files under `<base>/YYYY/MM/DD/`
//! - **Live state**: latest encoder reading via a watch channel or sampled stream
//! - **Bulk capture**: exactly N records into one file
//! - **Offline reading**: parse produced files back into packets
//!
//! ## Example (rotating capture)
//!
//! ```rust,no_run
//! use stm_enc::{CaptureConfig, StmEnc, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> stm_enc::Result<()> {
//!     let recorder = StmEnc::record(CaptureConfig::default()).await?;
//!     let mut updates = recorder.subscribe(UpdateRate::Max(1));
//!
//!     while let Some(state) = updates.next().await {
//!         println!("t={} state={}", state.timestamp, state.state);
//!     }
//!     recorder.finish().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire format and file layout
pub mod format;
pub mod storage;

// Ingest pipeline
pub mod capture;
pub mod driver;
pub mod recorder;
pub mod rotation;
pub mod source;
pub mod sources;
pub mod stream;

// Core exports
pub use config::CaptureConfig;
pub use error::*;
pub use types::*;

// Pipeline exports
pub use capture::{BulkCaptureSummary, bulk_capture};
pub use driver::{IngestSummary, StopReason};
pub use format::{CaptureReader, FileHeader, Packet, PacketKind};
pub use recorder::Recorder;
pub use rotation::RotationController;
pub use source::ByteSource;
pub use sources::TcpSource;

/// Entry point for recording and reading encoder captures.
///
/// # Examples
///
/// ## Bulk capture
/// ```rust,no_run
/// use stm_enc::StmEnc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> stm_enc::Result<()> {
///     let summary = StmEnc::capture("192.168.10.13", 7, "dump.dat", 10_000).await?;
///     println!("{} bytes", summary.bytes_written);
///     Ok(())
/// }
/// ```
///
/// ## Reading a produced file
/// ```rust,no_run
/// use stm_enc::{Packet, StmEnc};
///
/// # fn main() -> stm_enc::Result<()> {
/// let reader = StmEnc::open("el_2021-0805-010203+0000.dat")?;
/// for packet in reader.records() {
///     if let Packet::Encoder { timestamp, state } = packet {
///         println!("{timestamp} {state}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct StmEnc;

impl StmEnc {
    /// Start a rotating capture.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The base directory is missing or not writable
    /// - Another recorder holds the lock file
    /// - The controller cannot be reached
    pub async fn record(config: CaptureConfig) -> Result<Recorder> {
        Recorder::start(config).await
    }

    /// Capture exactly `record_count` records from `host:port` into `path`.
    ///
    /// Uses the default chunk size and cannot be cancelled; use
    /// [`bulk_capture`] directly for either.
    pub async fn capture(
        host: impl Into<String>,
        port: u16,
        path: impl AsRef<std::path::Path>,
        record_count: u64,
    ) -> Result<BulkCaptureSummary> {
        let mut source = TcpSource::new(host, port);
        source.connect().await?;
        let cancel = tokio_util::sync::CancellationToken::new();
        bulk_capture(&mut source, path, record_count, config::DEFAULT_CHUNK_SIZE, &cancel).await
    }

    /// Open a produced `.dat` file.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<CaptureReader> {
        CaptureReader::open(path)
    }
}
