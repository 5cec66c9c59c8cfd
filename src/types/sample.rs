//! Decoded sample records

use serde::{Deserialize, Serialize};

use super::CHANNELS;

/// One decoded packet: the device counter plus one value per channel.
///
/// Values are the raw big-endian pairs from the wire. The amplifier only
/// drives the low bits (0..=1023), but nothing here enforces that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Rolling packet counter from the device
    pub sequence_id: u8,

    /// Channel values in channel order
    pub channels: [u16; CHANNELS],
}

impl SampleRecord {
    /// Create a new record
    pub const fn new(sequence_id: u8, channels: [u16; CHANNELS]) -> Self {
        Self { sequence_id, channels }
    }

    /// Value of one channel, if the index is in range.
    pub fn channel(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied()
    }
}
