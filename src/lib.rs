//! Capture pipeline for a two-channel serial EEG amplifier.
//!
//! The amplifier streams fixed-size packets at 256 Hz with no alignment to
//! read boundaries. This crate frames them out of the byte stream, keeps the
//! most recent samples in a ring for live display, optionally records every
//! decoded sample to CSV, and hands consumers immutable snapshots without
//! ever blocking the capture path.
//!
//! # Architecture
//!
//! ```text
//! Transport --> capture task --> SampleRing --> watch slot --> consumers
//!                    |
//!                    +--> bounded queue --> writer thread --> CSV
//! ```
//!
//! - [`transport::Transport`] abstracts the byte source (serial port, raw
//!   capture replay)
//! - [`driver::CaptureDriver`] owns the transport, framer, ring and recorder
//!   on a single task
//! - [`Monitor`] is the operator handle: start and stop capture, toggle
//!   recording, read status, subscribe to snapshots
//!
//! # Example (replay)
//!
//! ```rust,no_run
//! use eeg_monitor::{Monitor, MonitorConfig, UpdateRate};
//! use eeg_monitor::transports::ReplayTransport;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> eeg_monitor::Result<()> {
//!     let mut monitor = Monitor::new(MonitorConfig::default())?;
//!     let mut snapshots = monitor.subscribe(UpdateRate::Max(30));
//!
//!     monitor.start_capture(ReplayTransport::open("capture.bin")?)?;
//!
//!     while let Some(snapshot) = snapshots.next().await {
//!         if let Some(latest) = snapshot.latest() {
//!             println!("#{} ch1={} ch2={}", latest.sequence_id, latest.channels[0], latest.channels[1]);
//!         }
//!     }
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

// Capture path
pub mod driver;
pub mod framing;
pub mod publisher;
pub mod recording;
pub mod ring;
pub mod transport;
pub mod transports;

// Consumer side
pub mod monitor;
pub mod render;
pub mod stream;

// Core exports
pub use config::{MonitorConfig, SerialConfig};
pub use error::*;
pub use types::*;

// Main API exports
pub use driver::{CapturePhase, CaptureStats, CaptureStatus};
pub use monitor::Monitor;
pub use recording::{CsvRecorder, RecordingSink, SinkOpener};
pub use render::{SnapshotConsumer, run_consumer};
pub use ring::{RING_CAPACITY, SampleRing};
pub use transport::Transport;
