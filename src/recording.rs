//! Recording sinks for decoded samples.
//!
//! A sink receives every decoded record, in arrival order, while recording is
//! enabled. The capture task owns at most one [`Recorder`] at a time. Each
//! recorder runs its sink on a dedicated writer thread fed by a bounded queue:
//! the sink is opened through a [`SinkOpener`] when recording is switched on,
//! and finalized when recording is switched off, when the sink fails, or when
//! capture ends.
//!
//! The bundled [`CsvRecorder`] writes one `sequence,ch1,ch2` line per record
//! and flushes after every line.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::types::SampleRecord;
use crate::{MonitorError, Result};

/// Header row written once at the top of every CSV log.
pub const CSV_HEADER: [&str; 3] = ["Counter", "Ch1", "Ch2"];

/// Destination for decoded records
pub trait RecordingSink: Send {
    /// Append one record. Should make it durable before returning.
    fn append(&mut self, record: &SampleRecord) -> Result<()>;

    /// Flush and release the destination. Called once.
    fn finish(&mut self) -> Result<()>;

    /// Human readable destination for status text
    fn describe(&self) -> String;
}

/// Creates a fresh sink each time recording is switched on.
pub trait SinkOpener: Send + Sync + 'static {
    fn open(&self) -> Result<Box<dyn RecordingSink>>;
}

impl<F> SinkOpener for F
where
    F: Fn() -> Result<Box<dyn RecordingSink>> + Send + Sync + 'static,
{
    fn open(&self) -> Result<Box<dyn RecordingSink>> {
        self()
    }
}

/// CSV log with a fixed header row.
pub struct CsvRecorder {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvRecorder {
    /// Create (truncating) the log and write the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| MonitorError::file_error(path.clone(), e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(CSV_HEADER)?;
        writer.flush().map_err(|e| MonitorError::file_error(path.clone(), e))?;

        info!("Recording to {}", path.display());
        Ok(Self { path, writer: Some(writer) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordingSink for CsvRecorder {
    fn append(&mut self, record: &SampleRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| MonitorError::recording_failed("log already finished"))?;

        let [ch1, ch2] = record.channels;
        writer.write_record([
            record.sequence_id.to_string(),
            ch1.to_string(),
            ch2.to_string(),
        ])?;
        writer.flush().map_err(|e| MonitorError::file_error(self.path.clone(), e))
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| MonitorError::file_error(self.path.clone(), e))?;
            debug!("Closed recording {}", self.path.display());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Opens a [`CsvRecorder`] at a fixed path. Each enable truncates the file.
#[derive(Debug, Clone)]
pub struct CsvSinkOpener {
    path: PathBuf,
}

impl CsvSinkOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SinkOpener for CsvSinkOpener {
    fn open(&self) -> Result<Box<dyn RecordingSink>> {
        Ok(Box::new(CsvRecorder::create(&self.path)?))
    }
}

/// Reported by a recording writer thread
#[derive(Debug)]
pub enum WriterEvent {
    /// The sink opened; carries its description
    Opened(String),
    /// The sink failed to open or write. The writer has stopped.
    Failed(MonitorError),
}

/// Handle to a sink running on its own writer thread.
///
/// Records are handed over with a non-blocking `try_send` into a bounded
/// queue, so a slow disk never stalls capture. The writer opens the sink,
/// appends in arrival order and finalizes once the handle is closed or
/// dropped and the queue has drained.
pub struct Recorder {
    records: mpsc::Sender<SampleRecord>,
    events: mpsc::UnboundedReceiver<WriterEvent>,
    writer: thread::JoinHandle<Result<u64>>,
}

impl Recorder {
    /// Start a writer thread for a sink from `opener`, buffering up to
    /// `capacity` records.
    pub fn spawn(opener: Arc<dyn SinkOpener>, capacity: usize) -> Result<Self> {
        let (records, queue) = mpsc::channel(capacity.max(1));
        let (event_tx, events) = mpsc::unbounded_channel();

        let writer = thread::Builder::new()
            .name("eeg-recorder".to_string())
            .spawn(move || write_records(opener.as_ref(), queue, event_tx))
            .map_err(|e| {
                MonitorError::recording_failed_with_source("cannot start writer", Box::new(e))
            })?;

        Ok(Self { records, events, writer })
    }

    /// Queue one record. Fails when the writer has stopped or has fallen a
    /// full queue behind; either way the recorder should be closed.
    pub fn append(&mut self, record: &SampleRecord) -> Result<()> {
        match self.records.try_send(*record) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(MonitorError::recording_failed(format!(
                "writer fell {} records behind",
                self.records.max_capacity()
            ))),
            Err(TrySendError::Closed(_)) => Err(self
                .take_failure()
                .unwrap_or_else(|| MonitorError::recording_failed("writer stopped"))),
        }
    }

    /// Next event from the writer, without waiting
    pub fn poll_event(&mut self) -> Option<WriterEvent> {
        self.events.try_recv().ok()
    }

    fn take_failure(&mut self) -> Option<MonitorError> {
        while let Some(event) = self.poll_event() {
            if let WriterEvent::Failed(e) = event {
                return Some(e);
            }
        }
        None
    }

    /// Stop accepting records. The writer drains what is queued and
    /// finalizes the sink in the background.
    pub fn close(self) -> WriterHandle {
        let Self { writer, .. } = self;
        WriterHandle { thread: writer }
    }
}

/// A closed recorder whose writer may still be draining.
pub struct WriterHandle {
    thread: thread::JoinHandle<Result<u64>>,
}

impl WriterHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the sink is finalized. Returns the records written.
    pub fn wait(self) -> Result<u64> {
        self.thread
            .join()
            .map_err(|_| MonitorError::recording_failed("writer thread panicked"))?
    }
}

fn write_records(
    opener: &dyn SinkOpener,
    mut queue: mpsc::Receiver<SampleRecord>,
    events: mpsc::UnboundedSender<WriterEvent>,
) -> Result<u64> {
    let mut sink = match opener.open() {
        Ok(sink) => sink,
        Err(e) => {
            warn!("Cannot open recording: {}", e);
            let _ = events.send(WriterEvent::Failed(e));
            return Err(MonitorError::recording_failed("sink never opened"));
        }
    };
    let _ = events.send(WriterEvent::Opened(sink.describe()));

    let mut written = 0u64;
    let mut failed = false;
    while let Some(record) = queue.blocking_recv() {
        if let Err(e) = sink.append(&record) {
            warn!(written, "Recording to {} failed: {}", sink.describe(), e);
            failed = true;
            let _ = events.send(WriterEvent::Failed(e));
            queue.close();
            break;
        }
        written += 1;
    }
    drop(queue);

    let finished = sink.finish();
    if let Err(e) = &finished {
        warn!("Failed to finalize recording {}: {}", sink.describe(), e);
    }
    debug!(written, "Recording writer for {} done", sink.describe());

    if failed {
        return Err(MonitorError::recording_failed(format!(
            "writer stopped after {} records",
            written
        )));
    }
    finished.map(|()| written)
}
