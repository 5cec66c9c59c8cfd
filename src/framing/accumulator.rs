//! Bounded holding area for bytes not yet resolved into packets

use tracing::trace;

/// Raw bytes received from the transport but not yet framed.
///
/// The held length never exceeds the capacity. When an append would overflow,
/// the oldest held bytes are dropped first so the newest window, which is the
/// one that can still contain a header, survives.
#[derive(Debug, Clone)]
pub struct ByteAccumulator {
    buf: Vec<u8>,
    capacity: usize,
    dropped: u64,
}

impl ByteAccumulator {
    /// Default capacity, large relative to one packet.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Create an accumulator holding at most `capacity` bytes (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: Vec::with_capacity(capacity), capacity, dropped: 0 }
    }

    /// Append a chunk, dropping the oldest held bytes if the result would
    /// exceed the capacity. Empty chunks are a no-op.
    pub fn append(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        // A single chunk at least as large as the window replaces everything.
        if chunk.len() >= self.capacity {
            let lost = self.buf.len() + (chunk.len() - self.capacity);
            self.dropped += lost as u64;
            self.buf.clear();
            self.buf.extend_from_slice(&chunk[chunk.len() - self.capacity..]);
            trace!(lost, "accumulator replaced by oversized chunk");
            return;
        }

        if self.buf.len() + chunk.len() > self.capacity {
            let keep = self.capacity - chunk.len();
            let lost = self.buf.len() - keep;
            self.buf.drain(..lost);
            self.dropped += lost as u64;
            trace!(lost, keep, "accumulator overflow, dropped oldest bytes");
        }

        self.buf.extend_from_slice(chunk);
    }

    /// Remove the first `n` bytes and shift the rest to the front.
    pub fn consume_up_to(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bytes discarded by overflow since creation.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for ByteAccumulator {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
