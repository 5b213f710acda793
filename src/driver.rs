//! Ingest loop
//!
//! The driver owns the byte source and the rotation controller and moves
//! chunks from one to the other until the peer closes the stream, the loop is
//! cancelled, or a fatal error occurs. Reading is the only suspension point;
//! decoding and file writes happen inline between reads.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{CaptureError, Result};
use crate::rotation::RotationController;
use crate::source::ByteSource;
use crate::storage::PathNamer;
use crate::types::{DecoderState, RecordCounters};

/// Why the ingest loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A zero-length read: the controller closed the connection
    PeerClosed,
    /// The cancellation token fired
    Cancelled,
}

/// Totals reported when the ingest loop ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub stop_reason: StopReason,
    pub chunks: u64,
    pub bytes: u64,
    pub counters: RecordCounters,
    pub files_opened: u64,
    pub files_completed: u64,
    pub latest: DecoderState,
    /// Bytes of an incomplete final record
    pub trailing_bytes: usize,
}

/// Handles returned by [`Driver::spawn`].
pub struct DriverChannels {
    /// Latest decoded state, updated after every chunk that carried an encoder record
    pub state: watch::Receiver<DecoderState>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// The ingest task itself
    pub task: JoinHandle<Result<IngestSummary>>,
}

/// Runs the ingest loop.
pub struct Driver;

impl Driver {
    /// Spawn the ingest loop as a task on the current runtime.
    pub fn spawn<S, N>(source: S, controller: RotationController<N>, chunk_size: usize) -> DriverChannels
    where
        S: ByteSource,
        N: PathNamer,
    {
        let (state_tx, state_rx) = watch::channel(controller.latest());
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let task = tokio::spawn(async move {
            Self::run(source, controller, chunk_size, cancel_task, state_tx).await
        });

        DriverChannels { state: state_rx, cancel, task }
    }

    /// Ingest until end-of-stream or cancellation.
    ///
    /// The active file is closed on every exit path. Source and file errors
    /// end the loop and are returned after the close.
    pub async fn run<S, N>(
        mut source: S,
        mut controller: RotationController<N>,
        chunk_size: usize,
        cancel: CancellationToken,
        state_tx: watch::Sender<DecoderState>,
    ) -> Result<IngestSummary>
    where
        S: ByteSource,
        N: PathNamer,
    {
        if chunk_size == 0 {
            return Err(CaptureError::invalid_config("chunk_size", "must be non-zero"));
        }

        info!("Ingest loop started");
        let mut chunks = 0u64;

        let outcome = loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Ingest loop cancelled");
                    break Ok(StopReason::Cancelled);
                }
                read = source.read_chunk(chunk_size) => read,
            };

            let chunk = match read {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    info!("Peer closed the stream after {} chunks", chunks);
                    break Ok(StopReason::PeerClosed);
                }
                Err(e) => {
                    error!("Read failed: {}", e);
                    break Err(e);
                }
            };

            chunks += 1;
            trace!("Chunk {}: {} bytes", chunks, chunk.len());

            match controller.ingest(&chunk) {
                Ok(true) => {
                    state_tx.send_replace(controller.latest());
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to persist chunk {}: {}", chunks, e);
                    break Err(e);
                }
            }
        };

        let closed = controller.close();
        let stop_reason = outcome?;
        closed?;

        let summary = IngestSummary {
            stop_reason,
            chunks,
            bytes: controller.bytes_ingested(),
            counters: controller.counters(),
            files_opened: controller.files_opened(),
            files_completed: controller.files_completed(),
            latest: controller.latest(),
            trailing_bytes: controller.pending_bytes(),
        };
        debug!(?summary, "Ingest loop ended");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CaptureReader;
    use crate::test_utils::{ScriptedSource, SequentialNamer, encoder_stream};

    #[tokio::test]
    async fn runs_until_peer_closes() {
        let dir = tempfile::tempdir().unwrap();
        let stream = encoder_stream(0..10);
        let source = ScriptedSource::from_stream(&stream, 11);
        let controller = RotationController::with_namer(SequentialNamer::new(dir.path()), 4);

        let (tx, rx) = watch::channel(DecoderState::default());
        let summary =
            Driver::run(source, controller, 64, CancellationToken::new(), tx).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::PeerClosed);
        assert_eq!(summary.bytes, stream.len() as u64);
        assert_eq!(summary.counters.encoder, 10);
        assert_eq!(summary.files_opened, 3);
        assert_eq!(summary.files_completed, 2);
        assert_eq!(summary.latest, DecoderState { timestamp: 9, state: 9 });
        assert_eq!(*rx.borrow(), summary.latest);

        let last = CaptureReader::open(SequentialNamer::new(dir.path()).path(2)).unwrap();
        assert_eq!(last.record_count(), 2);
    }

    #[tokio::test]
    async fn cancellation_closes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let stream = encoder_stream(0..3);
        let source = ScriptedSource::from_stream(&stream, 15).hold_open();
        let controller = RotationController::with_namer(SequentialNamer::new(dir.path()), 100);

        let channels = Driver::spawn(source, controller, 64);
        let mut state = channels.state.clone();
        while state.borrow_and_update().timestamp < 2 {
            state.changed().await.unwrap();
        }
        channels.cancel.cancel();

        let summary = channels.task.await.unwrap().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.files_completed, 0);

        let reader = CaptureReader::open(SequentialNamer::new(dir.path()).path(0)).unwrap();
        assert_eq!(reader.record_count(), 3);
    }

    #[tokio::test]
    async fn source_errors_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::from_stream(&encoder_stream(0..1), 15)
            .then_fail(CaptureError::connection_failed("reset by peer"));
        let controller = RotationController::with_namer(SequentialNamer::new(dir.path()), 100);

        let (tx, _rx) = watch::channel(DecoderState::default());
        let result = Driver::run(source, controller, 64, CancellationToken::new(), tx).await;
        assert!(matches!(result, Err(CaptureError::Connection { .. })));

        // The record that arrived before the failure is on disk
        let reader = CaptureReader::open(SequentialNamer::new(dir.path()).path(0)).unwrap();
        assert_eq!(reader.record_count(), 1);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::from_stream(&encoder_stream(0..1), 15).hold_open();
        let controller = RotationController::with_namer(SequentialNamer::new(dir.path()), 100);

        let channels = Driver::spawn(source, controller, 0);
        let result = channels.task.await.unwrap();
        assert!(matches!(result, Err(CaptureError::Config { .. })));
        assert!(!SequentialNamer::new(dir.path()).path(0).exists());
    }

    #[tokio::test]
    async fn collision_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let namer = SequentialNamer::new(dir.path());
        std::fs::write(namer.path(0), b"existing").unwrap();

        let source = ScriptedSource::from_stream(&encoder_stream(0..1), 15);
        let controller = RotationController::with_namer(namer, 100);
        let (tx, _rx) = watch::channel(DecoderState::default());

        let result = Driver::run(source, controller, 64, CancellationToken::new(), tx).await;
        assert!(matches!(result, Err(CaptureError::PathCollision { .. })));
    }
}
