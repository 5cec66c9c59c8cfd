//! Turning a chunked byte stream into decoded sample records.
//!
//! The transport delivers bytes with no alignment to packet boundaries. The
//! [`ByteAccumulator`] carries unresolved bytes across reads, the
//! [`PacketFramer`] finds header-aligned packets and resyncs one byte at a time
//! past anything else, and [`decode`] turns each packet into a
//! [`SampleRecord`](crate::SampleRecord).
//!
//! ```rust
//! use eeg_monitor::framing::{ByteAccumulator, PacketFramer, decode};
//! use eeg_monitor::types::PacketFormat;
//!
//! # fn main() -> eeg_monitor::Result<()> {
//! let format = PacketFormat::default();
//! let mut framer = PacketFramer::new(format)?;
//! let mut acc = ByteAccumulator::default();
//!
//! let mut packet = vec![0u8; format.size];
//! packet[..3].copy_from_slice(&[0xA5, 0x5A, 0x01]);
//!
//! let mut records = Vec::new();
//! framer.push(&mut acc, &packet[..1], |p| records.push(decode(&format, p)));
//! framer.push(&mut acc, &packet[1..], |p| records.push(decode(&format, p)));
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].sequence_id, 1);
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod decoder;
mod framer;

pub use accumulator::ByteAccumulator;
pub use decoder::decode;
pub use framer::{FrameSummary, Packet, PacketFramer};
