//! Capture driver: the task that owns the transport and the sample ring

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::MonitorConfig;
use crate::framing::{ByteAccumulator, PacketFramer, decode};
use crate::publisher::{SnapshotPublisher, SnapshotReceiver};
use crate::recording::{Recorder, SinkOpener, WriterEvent, WriterHandle};
use crate::ring::SampleRing;
use crate::transport::Transport;
use crate::{MonitorError, Result};

/// Operator requests applied by the capture task between reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    /// Open a fresh log (true) or finalize the current one (false)
    SetRecording(bool),
}

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Capturing,
    Stopped,
    Faulted,
}

/// Running counters for one capture session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub chunks: u64,
    pub bytes: u64,
    pub packets: u64,
    pub skipped_bytes: u64,
    pub overflow_bytes: u64,
    /// Records handed to a recorder, summed over every recording window
    pub recorded: u64,
}

/// Operator-visible state, published after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureStatus {
    pub phase: CapturePhase,
    pub recording: bool,
    /// Last status message, e.g. `Recording started` or `Read error: ...`
    pub message: String,
    pub stats: CaptureStats,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            recording: false,
            message: "Idle".to_string(),
            stats: CaptureStats::default(),
        }
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What one chunk did to the capture state
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub packets: usize,
    pub skipped: usize,
    /// Set when the recorder refused a record on this chunk; recording is now off
    pub recording_error: Option<MonitorError>,
}

/// Everything the capture path mutates, owned by one task.
pub struct CaptureState {
    accumulator: ByteAccumulator,
    framer: PacketFramer,
    ring: SampleRing,
    recorder: Option<Recorder>,
    /// Closed recorders whose writers may still be draining
    closing: Vec<WriterHandle>,
    recording_queue: usize,
    stats: CaptureStats,
}

impl CaptureState {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            accumulator: ByteAccumulator::with_capacity(config.accumulator_capacity),
            framer: PacketFramer::new(config.packet)?,
            ring: SampleRing::new(),
            recorder: None,
            closing: Vec::new(),
            recording_queue: config.recording_queue,
            stats: CaptureStats::default(),
        })
    }

    /// Frame, decode, store and record everything a chunk completes.
    ///
    /// Records are only queued for the writer here, so a slow sink never
    /// holds up framing.
    pub fn ingest(&mut self, chunk: &[u8]) -> IngestOutcome {
        let format = *self.framer.format();
        let ring = &mut self.ring;
        let recorder = &mut self.recorder;
        let closing = &mut self.closing;
        let mut recorded = 0u64;
        let mut recording_error = None;

        let summary = self.framer.push(&mut self.accumulator, chunk, |packet| {
            let record = decode(&format, packet);
            ring.insert(record);

            if let Some(active) = recorder.as_mut() {
                match active.append(&record) {
                    Ok(()) => recorded += 1,
                    Err(e) => {
                        if let Some(failed) = recorder.take() {
                            closing.push(failed.close());
                        }
                        recording_error = Some(e);
                    }
                }
            }
        });

        self.stats.chunks += 1;
        self.stats.bytes += chunk.len() as u64;
        self.stats.packets += summary.packets as u64;
        self.stats.skipped_bytes += summary.skipped as u64;
        self.stats.overflow_bytes = self.accumulator.dropped_bytes();
        self.stats.recorded += recorded;

        IngestOutcome { packets: summary.packets, skipped: summary.skipped, recording_error }
    }

    /// Start a fresh recorder, closing any previous one first.
    pub fn start_recording(&mut self, opener: Arc<dyn SinkOpener>) -> Result<()> {
        self.stop_recording();
        self.recorder = Some(Recorder::spawn(opener, self.recording_queue)?);
        Ok(())
    }

    /// Close the current recorder, if any. Its writer finalizes the sink in
    /// the background.
    pub fn stop_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            self.closing.push(recorder.close());
        }
        self.closing.retain(|writer| !writer.is_finished());
    }

    /// Drain writer events. Returns the failure if the writer stopped, in
    /// which case recording is now off.
    pub fn check_recording(&mut self) -> Option<MonitorError> {
        loop {
            match self.recorder.as_mut()?.poll_event()? {
                WriterEvent::Opened(destination) => info!("Recording to {}", destination),
                WriterEvent::Failed(e) => {
                    self.stop_recording();
                    return Some(e);
                }
            }
        }
    }

    /// Close recording and hand over every writer still running.
    pub fn take_writers(&mut self) -> Vec<WriterHandle> {
        self.stop_recording();
        std::mem::take(&mut self.closing)
    }

    /// Close recording and block until every sink is finalized.
    pub fn finalize_recording(&mut self) -> Result<()> {
        self.take_writers().into_iter().try_for_each(|writer| writer.wait().map(|_| ()))
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn ring(&self) -> &SampleRing {
        &self.ring
    }

    pub fn accumulator(&self) -> &ByteAccumulator {
        &self.accumulator
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }
}

/// Channels connecting a capture task to the outside
pub struct DriverLinks {
    pub publisher: SnapshotPublisher,
    pub status: Arc<watch::Sender<CaptureStatus>>,
    pub commands: mpsc::UnboundedReceiver<CaptureCommand>,
    pub cancel: CancellationToken,
    /// Where recording goes when switched on
    pub recording: Option<Arc<dyn SinkOpener>>,
}

/// Result of [`CaptureDriver::spawn`]
pub struct CaptureChannels {
    /// Latest ring snapshot
    pub snapshots: SnapshotReceiver,
    /// Operator status
    pub status: watch::Receiver<CaptureStatus>,
    /// Recording toggle
    pub commands: mpsc::UnboundedSender<CaptureCommand>,
    /// Stops the capture loop
    pub cancel: CancellationToken,
    pub handle: JoinHandle<()>,
}

/// Spawns and runs the capture task
pub struct CaptureDriver;

impl CaptureDriver {
    /// Spawn a capture task with fresh channels.
    pub fn spawn<T>(
        transport: T,
        config: &MonitorConfig,
        recording: Option<Arc<dyn SinkOpener>>,
    ) -> Result<CaptureChannels>
    where
        T: Transport,
    {
        let state = CaptureState::new(config)?;
        let (publisher, snapshots) = SnapshotPublisher::channel();
        let (status_tx, status_rx) = watch::channel(CaptureStatus::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let links = DriverLinks {
            publisher,
            status: Arc::new(status_tx),
            commands: command_rx,
            cancel: cancel.clone(),
            recording,
        };

        let handle = Self::spawn_with(transport, state, config, links);

        Ok(CaptureChannels { snapshots, status: status_rx, commands: command_tx, cancel, handle })
    }

    /// Spawn a capture task on caller-provided channels.
    pub fn spawn_with<T>(
        transport: T,
        state: CaptureState,
        config: &MonitorConfig,
        links: DriverLinks,
    ) -> JoinHandle<()>
    where
        T: Transport,
    {
        let read_size = config.read_size;
        let timeout = config.read_timeout();
        tokio::spawn(async move {
            Self::capture_task(transport, state, read_size, timeout, links).await;
        })
    }

    /// Capture loop: read, frame, publish; apply commands between reads.
    async fn capture_task<T>(
        mut transport: T,
        mut state: CaptureState,
        read_size: usize,
        timeout: Duration,
        mut links: DriverLinks,
    ) where
        T: Transport,
    {
        let source = transport.describe();
        info!("Capture started on {}", source);

        links.status.send_modify(|s| {
            s.phase = CapturePhase::Capturing;
            s.recording = false;
            s.message = "Capturing".to_string();
            s.stats = CaptureStats::default();
        });

        // Show the (zero-filled) history right away
        links.publisher.publish(state.ring());

        let end = loop {
            while let Ok(command) = links.commands.try_recv() {
                Self::apply_command(command, &mut state, &links);
            }
            if let Some(e) = state.check_recording() {
                Self::report_recording_error(&e, state.stats(), &links);
            }

            let result = tokio::select! {
                _ = links.cancel.cancelled() => {
                    info!("Capture cancelled");
                    break (CapturePhase::Stopped, "Capture stopped".to_string());
                }
                result = transport.read(read_size, timeout) => result,
            };

            match result {
                Ok(Some(chunk)) if chunk.is_empty() => {
                    trace!("No data within read timeout");
                }
                Ok(Some(chunk)) => {
                    let outcome = state.ingest(&chunk);
                    if outcome.packets > 0 {
                        links.publisher.publish(state.ring());
                    }

                    let stats = state.stats();
                    match outcome.recording_error {
                        Some(e) => Self::report_recording_error(&e, stats, &links),
                        None => links.status.send_modify(|s| s.stats = stats),
                    }
                }
                Ok(None) => {
                    info!("Transport {} closed", source);
                    break (CapturePhase::Stopped, "Transport closed".to_string());
                }
                Err(e) => {
                    error!("Transport fault on {}: {}", source, e);
                    break (CapturePhase::Faulted, format!("Read error: {}", e));
                }
            }
        };

        let writers = state.take_writers();
        if !writers.is_empty() {
            let finalized = tokio::task::spawn_blocking(move || {
                writers.into_iter().filter_map(|writer| writer.wait().err()).collect::<Vec<_>>()
            })
            .await;
            match finalized {
                Ok(errors) => {
                    for e in errors {
                        warn!("Recording not cleanly finalized: {}", e);
                    }
                }
                Err(e) => warn!("Recording writers did not join: {}", e),
            }
        }

        if let Err(e) = transport.close().await {
            debug!("Transport close failed: {}", e);
        }

        let stats = state.stats();
        info!(
            packets = stats.packets,
            skipped = stats.skipped_bytes,
            overflow = stats.overflow_bytes,
            "Capture ended on {}",
            source
        );

        let (phase, message) = end;
        links.status.send_modify(|s| {
            s.phase = phase;
            s.recording = false;
            s.message = message;
            s.stats = stats;
        });
    }

    fn apply_command(command: CaptureCommand, state: &mut CaptureState, links: &DriverLinks) {
        match command {
            CaptureCommand::SetRecording(true) => {
                let result = match &links.recording {
                    Some(opener) => state.start_recording(Arc::clone(opener)),
                    None => Err(MonitorError::recording_failed("no recording destination configured")),
                };

                match result {
                    Ok(()) => {
                        info!("Recording started");
                        links.status.send_modify(|s| {
                            s.recording = true;
                            s.message = "Recording started".to_string();
                        });
                    }
                    Err(e) => Self::report_recording_error(&e, state.stats(), links),
                }
            }
            CaptureCommand::SetRecording(false) => {
                state.stop_recording();
                info!("Recording stopped");
                links.status.send_modify(|s| {
                    s.recording = false;
                    s.message = "Recording stopped".to_string();
                });
            }
        }
    }

    fn report_recording_error(e: &MonitorError, stats: CaptureStats, links: &DriverLinks) {
        warn!("Recording failed, capture continues: {}", e);
        links.status.send_modify(|s| {
            s.recording = false;
            s.message = format!("Recording error: {}", e);
            s.stats = stats;
        });
    }
}
