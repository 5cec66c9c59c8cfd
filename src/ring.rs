//! Fixed-capacity circular store of the most recent sample records

use crate::types::{SampleRecord, Snapshot};

/// Number of records kept for display.
pub const RING_CAPACITY: usize = 512;

/// Circular buffer of the last `N` records.
///
/// Storage is a fixed array allocated once; `cursor` is the next slot to be
/// written, which is also the oldest slot once the ring has wrapped. Slots
/// never written hold zero-valued records.
#[derive(Debug, Clone)]
pub struct SampleRing<const N: usize = RING_CAPACITY> {
    slots: Box<[SampleRecord; N]>,
    cursor: usize,
    inserted: u64,
}

impl<const N: usize> SampleRing<N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "ring capacity must be non-zero") };
        Self { slots: Box::new([SampleRecord::default(); N]), cursor: 0, inserted: 0 }
    }

    /// Overwrite the oldest slot with `record` and advance the cursor.
    #[inline]
    pub fn insert(&mut self, record: SampleRecord) {
        self.slots[self.cursor] = record;
        self.cursor = (self.cursor + 1) % N;
        self.inserted += 1;
    }

    /// Copy all `N` slots out in chronological order.
    pub fn snapshot(&self) -> Snapshot {
        // slots[cursor..] are older than slots[..cursor]
        let mut records = Vec::with_capacity(N);
        records.extend_from_slice(&self.slots[self.cursor..]);
        records.extend_from_slice(&self.slots[..self.cursor]);
        Snapshot::new(records.into_boxed_slice(), self.inserted)
    }

    /// Most recently inserted record
    pub fn latest(&self) -> Option<&SampleRecord> {
        (self.inserted > 0).then(|| &self.slots[(self.cursor + N - 1) % N])
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Index of the next slot to be written
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_inserted(&self) -> u64 {
        self.inserted
    }

    /// Reset to the zero-filled initial state.
    pub fn clear(&mut self) {
        self.slots.fill(SampleRecord::default());
        self.cursor = 0;
        self.inserted = 0;
    }
}

impl<const N: usize> Default for SampleRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
