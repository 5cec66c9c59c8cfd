//! Test utilities: synthetic packet streams, scripted transports and
//! in-memory recording sinks shared by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::recording::RecordingSink;
use crate::transport::{RawChunk, Transport};
use crate::types::{PacketFormat, SampleRecord};
use crate::{MonitorError, Result};

/// `count` distinct records with channel values inside the 10-bit range.
///
/// Keeping values at or below 1023 means no header byte pair can appear
/// inside an encoded packet.
pub fn records(count: usize) -> Vec<SampleRecord> {
    (0..count)
        .map(|i| {
            SampleRecord::new(i as u8, [((i * 7) % 1024) as u16, (1023 - (i % 1024)) as u16])
        })
        .collect()
}

/// Encode `records` back to back, inserting `gaps[i % gaps.len()]` before
/// packet `i`. An empty `gaps` slice produces a clean stream.
pub fn encode_stream(format: &PacketFormat, records: &[SampleRecord], gaps: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::with_capacity(records.len() * format.size);
    for (i, record) in records.iter().enumerate() {
        if !gaps.is_empty() {
            stream.extend_from_slice(&gaps[i % gaps.len()]);
        }
        stream.extend_from_slice(&format.encode(record));
    }
    stream
}

/// Junk bytes that can never form the default header
#[cfg(test)]
pub fn garbage_without_header() -> impl proptest::strategy::Strategy<Value = Vec<u8>> {
    use proptest::prelude::*;
    prop::collection::vec(any::<u8>().prop_filter("header lead byte", |b| *b != 0xA5), 0..20)
}

enum Step {
    Chunk(RawChunk),
    Fault(String),
}

/// Transport that plays back a fixed script of reads.
///
/// When the script runs out the transport reports closed, unless
/// [`ScriptedTransport::hold_open`] was used, in which case it waits for
/// bytes pushed through [`ScriptedTransport::feeder`] and returns empty
/// chunks on timeout like an idle serial port.
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    hold_open: bool,
    feed_tx: mpsc::UnboundedSender<RawChunk>,
    feed_rx: mpsc::UnboundedReceiver<RawChunk>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        Self { steps: VecDeque::new(), hold_open: false, feed_tx, feed_rx }
    }

    /// Split `bytes` into reads of at most `chunk_size`.
    pub fn chunked(bytes: &[u8], chunk_size: usize) -> Self {
        bytes.chunks(chunk_size.max(1)).fold(Self::new(), |t, c| t.chunk(c.to_vec()))
    }

    pub fn chunk(mut self, bytes: RawChunk) -> Self {
        self.steps.push_back(Step::Chunk(bytes));
        self
    }

    pub fn fault(mut self, reason: &str) -> Self {
        self.steps.push_back(Step::Fault(reason.to_string()));
        self
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Sender for bytes delivered after the script is exhausted
    pub fn feeder(&self) -> mpsc::UnboundedSender<RawChunk> {
        self.feed_tx.clone()
    }

    fn deliver(&mut self, mut chunk: RawChunk, max_bytes: usize) -> RawChunk {
        if chunk.len() > max_bytes {
            let rest = chunk.split_off(max_bytes);
            self.steps.push_front(Step::Chunk(rest));
        }
        chunk
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Option<RawChunk>> {
        match self.steps.pop_front() {
            Some(Step::Chunk(chunk)) => return Ok(Some(self.deliver(chunk, max_bytes))),
            Some(Step::Fault(reason)) => return Err(MonitorError::transport_failed(reason)),
            None if !self.hold_open => return Ok(None),
            None => {}
        }

        match tokio::time::timeout(timeout, self.feed_rx.recv()).await {
            Ok(Some(chunk)) => Ok(Some(self.deliver(chunk, max_bytes))),
            Ok(None) => Ok(None),
            Err(_) => Ok(Some(Vec::new())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// What a [`MemorySink`] has seen
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub records: Vec<SampleRecord>,
    pub finished: usize,
}

/// Sink that keeps records in memory. Clones share one log.
#[derive(Debug, Clone)]
pub struct MemorySink {
    log: Arc<Mutex<MemoryLog>>,
    delay: Duration,
}

impl MemorySink {
    pub fn new() -> (Self, Arc<Mutex<MemoryLog>>) {
        Self::slow(Duration::ZERO)
    }

    /// Like [`MemorySink::new`], but every append sleeps for `delay` first,
    /// like a slow disk.
    pub fn slow(delay: Duration) -> (Self, Arc<Mutex<MemoryLog>>) {
        let log = Arc::new(Mutex::new(MemoryLog::default()));
        (Self { log: Arc::clone(&log), delay }, log)
    }

    fn log(&self) -> Result<std::sync::MutexGuard<'_, MemoryLog>> {
        self.log.lock().map_err(|_| MonitorError::recording_failed("memory log poisoned"))
    }
}

impl RecordingSink for MemorySink {
    fn append(&mut self, record: &SampleRecord) -> Result<()> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.log()?.records.push(*record);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.log()?.finished += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Sink that accepts a fixed number of records, then fails every write.
#[derive(Debug)]
pub struct FailingSink {
    remaining: usize,
}

impl FailingSink {
    pub fn after(successes: usize) -> Self {
        Self { remaining: successes }
    }
}

impl RecordingSink for FailingSink {
    fn append(&mut self, _record: &SampleRecord) -> Result<()> {
        if self.remaining == 0 {
            return Err(MonitorError::recording_failed("disk full"));
        }
        self.remaining -= 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}
