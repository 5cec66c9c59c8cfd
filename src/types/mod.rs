//! Core value types shared by the capture path and its consumers.
//!
//! - [`PacketFormat`] describes the fixed-size wire layout the framer scans for
//! - [`SampleRecord`] is one decoded packet
//! - [`Snapshot`] is an immutable, oldest-first copy of the sample ring
//! - [`UpdateRate`] controls how often consumers receive snapshots
//!
//! ```rust
//! use eeg_monitor::types::{PacketFormat, SampleRecord};
//!
//! let format = PacketFormat::default();
//! let bytes = format.encode(&SampleRecord::new(1, [512, 1023]));
//! assert_eq!(bytes.len(), format.size);
//! assert!(format.is_header_at(&bytes, 0));
//! ```

mod packet;
mod sample;
mod snapshot;
mod update_rate;

/// Number of channels every record carries.
pub const CHANNELS: usize = 2;

pub use packet::PacketFormat;
pub use sample::SampleRecord;
pub use snapshot::{DISPLAY_RANGE, Snapshot};
pub use update_rate::UpdateRate;
