//! Operator-facing handle over one capture session at a time

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::driver::{
    CaptureCommand, CaptureDriver, CapturePhase, CaptureState, CaptureStatus, DriverLinks,
};
use crate::publisher::{SnapshotPublisher, SnapshotReceiver};
use crate::recording::{CsvSinkOpener, SinkOpener};
use crate::stream::CoalesceExt;
use crate::transport::Transport;
use crate::types::{Snapshot, UpdateRate};
use crate::{MonitorError, Result};

#[cfg(test)]
mod tests;

/// Running capture task and its control handles
struct CaptureSession {
    commands: mpsc::UnboundedSender<CaptureCommand>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start, stop and observe capture from the operator side.
///
/// Snapshot and status channels outlive individual sessions, so consumers
/// can subscribe before capture starts and keep their streams across
/// restarts.
pub struct Monitor {
    config: MonitorConfig,
    recording: Option<Arc<dyn SinkOpener>>,
    publisher: SnapshotPublisher,
    snapshots: SnapshotReceiver,
    status_tx: Arc<watch::Sender<CaptureStatus>>,
    status_rx: watch::Receiver<CaptureStatus>,
    session: Option<CaptureSession>,
}

impl Monitor {
    /// Create an idle monitor. A configured `recording_path` becomes the CSV
    /// recording destination.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let recording = config
            .recording_path
            .as_ref()
            .map(|path| Arc::new(CsvSinkOpener::new(path)) as Arc<dyn SinkOpener>);

        let (publisher, snapshots) = SnapshotPublisher::channel();
        let (status_tx, status_rx) = watch::channel(CaptureStatus::default());

        Ok(Self {
            config,
            recording,
            publisher,
            snapshots,
            status_tx: Arc::new(status_tx),
            status_rx,
            session: None,
        })
    }

    /// Replace the recording destination used by later sessions.
    pub fn with_recording_destination(mut self, opener: impl SinkOpener) -> Self {
        self.recording = Some(Arc::new(opener));
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Spawn the capture task on `transport`.
    pub fn start_capture<T: Transport>(&mut self, transport: T) -> Result<()> {
        if self.is_capturing() {
            return Err(MonitorError::AlreadyRunning);
        }

        let state = CaptureState::new(&self.config)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let links = DriverLinks {
            publisher: self.publisher.clone(),
            status: Arc::clone(&self.status_tx),
            commands: command_rx,
            cancel: cancel.clone(),
            recording: self.recording.clone(),
        };

        info!("Starting capture on {}", transport.describe());
        let handle = CaptureDriver::spawn_with(transport, state, &self.config, links);
        self.session = Some(CaptureSession { commands, cancel, handle });
        Ok(())
    }

    /// Stop capture and wait for the task to release the transport and log.
    pub async fn stop_capture(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Err(MonitorError::Closed);
        };

        session.cancel.cancel();
        if let Err(e) = session.handle.await {
            warn!("Capture task ended abnormally: {}", e);
            self.status_tx.send_modify(|s| {
                s.phase = CapturePhase::Faulted;
                s.recording = false;
                s.message = format!("Capture task failed: {}", e);
            });
        }

        debug!("Capture stopped by operator");
        Ok(())
    }

    /// Switch recording on or off. Applied by the capture task before its
    /// next read, never mid-packet.
    pub fn set_recording(&self, enabled: bool) -> Result<()> {
        let session = self.session.as_ref().ok_or(MonitorError::Closed)?;
        if session.handle.is_finished() {
            return Err(MonitorError::Closed);
        }
        session
            .commands
            .send(CaptureCommand::SetRecording(enabled))
            .map_err(|_| MonitorError::Closed)
    }

    /// Current status text
    pub fn status(&self) -> String {
        self.status_rx.borrow().message.clone()
    }

    /// Current status with phase and counters
    pub fn status_report(&self) -> CaptureStatus {
        self.status_rx.borrow().clone()
    }

    /// Status changes as a stream, starting with the current value
    pub fn status_updates(&self) -> impl Stream<Item = CaptureStatus> + 'static {
        WatchStream::new(self.status_rx.clone())
    }

    /// Whether a capture task is alive
    pub fn is_capturing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.handle.is_finished())
    }

    /// Latest published snapshot
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Snapshot stream at the given rate. Intermediate snapshots are
    /// coalesced; a slow consumer always gets the newest one.
    pub fn subscribe(&self, rate: UpdateRate) -> impl Stream<Item = Arc<Snapshot>> + 'static {
        let snapshots =
            WatchStream::new(self.publisher.subscribe()).filter_map(|opt| async move { opt });

        match rate.throttle_interval(self.config.sample_rate_hz) {
            None => snapshots.boxed(),
            Some(period) => snapshots.coalesce(period).boxed(),
        }
    }

    /// Wait until at least `count` records have been captured.
    pub async fn wait_for_samples(&self, count: u64, timeout: Duration) -> Result<Arc<Snapshot>> {
        let mut rx = self.publisher.subscribe();
        let wait = async {
            let snapshot = rx
                .wait_for(|s| s.as_ref().is_some_and(|s| s.total_inserted() >= count))
                .await
                .map_err(|_| MonitorError::Closed)?;
            snapshot.clone().ok_or(MonitorError::Closed)
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| MonitorError::Timeout { duration: timeout })?
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            debug!("Dropping monitor, cancelling capture");
            session.cancel.cancel();
        }
    }
}
