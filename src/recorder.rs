//! Recorder handle
//!
//! [`Recorder`] ties everything together: it validates the configuration,
//! checks the destination, takes the lock file, connects to the controller and
//! spawns the ingest loop. Callers read the decoded state through the handle
//! while the loop runs.

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::driver::{Driver, IngestSummary};
use crate::rotation::RotationController;
use crate::source::ByteSource;
use crate::sources::TcpSource;
use crate::storage::{LockFile, check_writable_dir};
use crate::stream::SampleExt;
use crate::types::{DecoderState, UpdateRate};
use crate::{CaptureError, Result};

/// A running rotating capture.
pub struct Recorder {
    /// Decoded state watch receiver
    state: watch::Receiver<DecoderState>,

    /// Cancellation token for the ingest task
    cancel: CancellationToken,

    /// Ingest task; taken by `finish`. Owns the lock file, so the lock is
    /// released only after the active file is closed.
    task: Option<JoinHandle<Result<IngestSummary>>>,
}

impl Recorder {
    /// Connect to the controller named in `config` and start recording.
    pub async fn start(config: CaptureConfig) -> Result<Self> {
        let lock = Self::prepare(&config)?;

        let mut source = TcpSource::new(config.host.clone(), config.port);
        source.connect().await?;

        Self::spawn(&config, source, lock)
    }

    /// Start recording from an already-established source.
    pub fn with_source<S: ByteSource>(config: CaptureConfig, source: S) -> Result<Self> {
        let lock = Self::prepare(&config)?;
        if !source.is_connected() {
            return Err(CaptureError::NotConnected);
        }
        Self::spawn(&config, source, lock)
    }

    fn prepare(config: &CaptureConfig) -> Result<Option<LockFile>> {
        config.validate()?;
        check_writable_dir(&config.base_dir)?;
        config.lock_path.as_ref().map(|path| LockFile::acquire(path)).transpose()
    }

    fn spawn<S: ByteSource>(config: &CaptureConfig, source: S, lock: Option<LockFile>) -> Result<Self> {
        let controller = RotationController::new(config)?;
        let chunk_size = config.chunk_size;

        let (state_tx, state) = watch::channel(controller.latest());
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();
        let task = tokio::spawn(async move {
            let _lock = lock;
            Driver::run(source, controller, chunk_size, cancel_task, state_tx).await
        });

        info!(
            "Recording from {} into {} ({} records per file)",
            config.peer(),
            config.base_dir.display(),
            config.file_length
        );

        Ok(Self { state, cancel, task: Some(task) })
    }

    /// Latest decoded timestamp and state.
    pub fn latest(&self) -> DecoderState {
        *self.state.borrow()
    }

    /// Every state change, starting with the current value.
    pub fn state_updates(&self) -> WatchStream<DecoderState> {
        WatchStream::new(self.state.clone())
    }

    /// State changes at no more than `rate`.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, DecoderState> {
        let updates = self.state_updates();
        match rate.sample_interval() {
            None => updates.boxed(),
            Some(period) => updates.sample(period).boxed(),
        }
    }

    /// Ask the ingest loop to stop. The active file is closed by the loop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the ingest loop has ended on its own or been stopped.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the ingest loop to end and return its summary.
    ///
    /// Does not stop the loop; call [`Recorder::stop`] first to end a capture
    /// that is still receiving data.
    pub async fn finish(mut self) -> Result<IngestSummary> {
        let task = self.task.take().ok_or_else(|| CaptureError::Task {
            reason: "ingest task already joined".to_string(),
        })?;
        task.await.map_err(|e| CaptureError::Task { reason: e.to_string() })?
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        debug!("Dropping recorder");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StopReason;
    use crate::test_utils::{ScriptedSource, encoder_stream};

    fn config(dir: &std::path::Path) -> CaptureConfig {
        CaptureConfig::default()
            .with_base_dir(dir)
            .with_lock_path(Some(dir.join("el_enc.lock")))
            .with_file_length(1_000)
    }

    #[tokio::test]
    async fn records_until_the_peer_closes() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::from_stream(&encoder_stream(0..30), 16);

        let recorder = Recorder::with_source(config(dir.path()), source).unwrap();
        assert!(dir.path().join("el_enc.lock").exists());

        let summary = recorder.finish().await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::PeerClosed);
        assert_eq!(summary.counters.encoder, 30);
        assert_eq!(summary.latest, DecoderState { timestamp: 29, state: 29 });
        assert_eq!(summary.files_opened, 1);
        assert!(!dir.path().join("el_enc.lock").exists());
    }

    #[tokio::test]
    async fn stop_ends_an_idle_capture() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::from_stream(&encoder_stream(0..2), 15).hold_open();
        let recorder = Recorder::with_source(config(dir.path()), source).unwrap();

        let mut updates = recorder.state_updates();
        while let Some(state) = updates.next().await {
            if state.timestamp == 1 {
                break;
            }
        }
        assert_eq!(recorder.latest(), DecoderState { timestamp: 1, state: 1 });

        recorder.stop();
        let summary = recorder.finish().await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn dropped_recorder_keeps_the_lock_until_the_file_is_closed() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("el_enc.lock");
        let source = ScriptedSource::from_stream(&encoder_stream(0..3), 15).hold_open();
        let recorder = Recorder::with_source(config(dir.path()), source).unwrap();

        let mut updates = recorder.state_updates();
        while let Some(state) = updates.next().await {
            if state.timestamp == 2 {
                break;
            }
        }

        drop(recorder);
        // The ingest task has not run since the cancel; the lock is still held
        assert!(lock.exists());

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while lock.exists() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let mut files = Vec::new();
        let mut pending = vec![dir.path().to_path_buf()];
        while let Some(d) = pending.pop() {
            for entry in std::fs::read_dir(d).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "dat") {
                    files.push(path);
                }
            }
        }
        assert_eq!(files.len(), 1);
        assert_eq!(crate::format::CaptureReader::open(&files[0]).unwrap().record_count(), 3);
    }

    #[tokio::test]
    async fn second_recorder_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let first = ScriptedSource::new(vec![]).hold_open();
        let _running = Recorder::with_source(config(dir.path()), first).unwrap();

        let second = ScriptedSource::new(vec![]);
        let result = Recorder::with_source(config(dir.path()), second);
        assert!(matches!(result, Err(CaptureError::Locked { .. })));
    }

    #[tokio::test]
    async fn startup_checks_fail_fast() {
        let dir = tempfile::tempdir().unwrap();

        let missing = config(dir.path()).with_base_dir(dir.path().join("missing"));
        let result = Recorder::with_source(missing, ScriptedSource::new(vec![]));
        assert!(matches!(result, Err(CaptureError::PathNotWritable { .. })));

        let disconnected = ScriptedSource::new(vec![]).disconnected();
        let result = Recorder::with_source(config(dir.path()), disconnected);
        assert!(matches!(result, Err(CaptureError::NotConnected)));
        // Lock released by the failed start
        assert!(!dir.path().join("el_enc.lock").exists());
    }

    #[tokio::test]
    async fn unreachable_controller_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Recorder::start(config(dir.path()).with_peer("127.0.0.1", port)).await;
        assert!(matches!(result, Err(CaptureError::Connection { .. })));
        assert!(!dir.path().join("el_enc.lock").exists());
    }
}
