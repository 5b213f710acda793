//! Byte source trait for the ingest loop

use crate::Result;

/// A connected stream of raw bytes from the encoder controller.
///
/// The ingest loop does not care how bytes arrive; it only needs chunks in
/// order and a clear end-of-stream signal.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Read up to `max_len` bytes.
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - at least one byte arrived
    /// - `Ok(None)` - the peer closed the stream (a zero-length read)
    /// - `Err(e)` - the read failed
    ///
    /// Waits as long as it takes for data; there is no read timeout.
    async fn read_chunk(&mut self, max_len: usize) -> Result<Option<Vec<u8>>>;

    /// Whether the source has an established stream.
    fn is_connected(&self) -> bool {
        true
    }
}
