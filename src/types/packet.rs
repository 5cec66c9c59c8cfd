//! Packet layout for the amplifier wire format

use serde::{Deserialize, Serialize};

use super::{CHANNELS, SampleRecord};

/// Byte layout of one fixed-size packet.
///
/// Packets are not length-prefixed. A packet is recognized only by the two
/// header bytes at its start plus the fixed `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketFormat {
    /// Header signature (`H1 H2`)
    pub header: [u8; 2],

    /// Total packet length in bytes, header included
    pub size: usize,

    /// Offset of the sequence identifier byte
    pub sequence_offset: usize,

    /// Offset of the first channel's big-endian pair
    pub channel_offset: usize,
}

impl Default for PacketFormat {
    fn default() -> Self {
        Self { header: [0xA5, 0x5A], size: 17, sequence_offset: 2, channel_offset: 3 }
    }
}

impl PacketFormat {
    /// ModularEEG "P2" firmware layout: a version byte follows the header,
    /// then the counter, then the channel pairs.
    pub const fn modular_eeg_p2() -> Self {
        Self { header: [0xA5, 0x5A], size: 17, sequence_offset: 3, channel_offset: 4 }
    }

    /// Number of bytes the channel payload occupies.
    pub const fn channel_bytes(&self) -> usize {
        CHANNELS * 2
    }

    /// Validate that every field the decoder reads lies inside the packet.
    pub fn validate(&self) -> crate::Result<()> {
        if self.size < 2 {
            return Err(crate::MonitorError::config_invalid(format!(
                "packet size {} cannot hold the header",
                self.size
            )));
        }

        if self.sequence_offset < 2 || self.sequence_offset >= self.size {
            return Err(crate::MonitorError::config_invalid(format!(
                "sequence offset {} outside payload of {}-byte packet",
                self.sequence_offset, self.size
            )));
        }

        let channels_end = self.channel_offset + self.channel_bytes();
        if self.channel_offset < 2 || channels_end > self.size {
            return Err(crate::MonitorError::config_invalid(format!(
                "channel bytes {}..{} outside payload of {}-byte packet",
                self.channel_offset, channels_end, self.size
            )));
        }

        let sequence = self.sequence_offset;
        if (self.channel_offset..channels_end).contains(&sequence) {
            return Err(crate::MonitorError::config_invalid(format!(
                "sequence offset {} overlaps channel bytes",
                sequence
            )));
        }

        Ok(())
    }

    /// Whether the header signature starts at `index`.
    #[inline]
    pub fn is_header_at(&self, buf: &[u8], index: usize) -> bool {
        buf.get(index) == Some(&self.header[0]) && buf.get(index + 1) == Some(&self.header[1])
    }

    /// Build the wire bytes for a record. Padding bytes are zero.
    ///
    /// Used by simulators and replay fixtures; the capture path only decodes.
    pub fn encode(&self, record: &SampleRecord) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size];
        bytes[0] = self.header[0];
        bytes[1] = self.header[1];
        bytes[self.sequence_offset] = record.sequence_id;
        for (ch, value) in record.channels.iter().enumerate() {
            let at = self.channel_offset + ch * 2;
            bytes[at..at + 2].copy_from_slice(&value.to_be_bytes());
        }
        bytes
    }
}
