//! Packet payload decoding

use super::Packet;
use crate::types::{CHANNELS, PacketFormat, SampleRecord};

/// Decode a framed packet into a sample record.
///
/// The header and length were established by the framer and are not checked
/// again. Each channel is a big-endian `u16`; no range clamping happens here.
pub fn decode(format: &PacketFormat, packet: Packet<'_>) -> SampleRecord {
    let bytes = packet.as_bytes();
    let byte = |i: usize| bytes.get(i).copied().unwrap_or(0);

    let mut channels = [0u16; CHANNELS];
    for (ch, value) in channels.iter_mut().enumerate() {
        let at = format.channel_offset + ch * 2;
        *value = u16::from_be_bytes([byte(at), byte(at + 1)]);
    }

    SampleRecord { sequence_id: byte(format.sequence_offset), channels }
}
