//! Immutable, chronologically ordered copies of the sample ring

use super::SampleRecord;

/// Upper bound of the display scale used by renderers.
pub const DISPLAY_RANGE: f32 = 1024.0;

/// Point-in-time copy of the sample ring, oldest record first.
///
/// The length always equals the ring capacity. Before the ring has wrapped
/// once, the leading slots are zero-valued records; [`Snapshot::filled`] tells
/// how many trailing slots hold real data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    records: Box<[SampleRecord]>,
    total_inserted: u64,
}

impl Snapshot {
    /// Create a snapshot from records already in chronological order.
    pub fn new(records: Box<[SampleRecord]>, total_inserted: u64) -> Self {
        Self { records, total_inserted }
    }

    /// All slots, oldest first
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest slot, i.e. the last record inserted before the copy was taken.
    pub fn latest(&self) -> Option<&SampleRecord> {
        self.records.last()
    }

    /// Number of records ever inserted into the ring at snapshot time.
    pub fn total_inserted(&self) -> u64 {
        self.total_inserted
    }

    /// Number of trailing slots holding real records.
    pub fn filled(&self) -> usize {
        usize::try_from(self.total_inserted).map_or(self.len(), |n| n.min(self.len()))
    }

    /// Raw values of one channel, oldest first.
    pub fn channel(&self, index: usize) -> impl Iterator<Item = u16> + '_ {
        self.records.iter().map(move |r| r.channel(index).unwrap_or(0))
    }

    /// One channel scaled to `0.0..=1.0` against [`DISPLAY_RANGE`], clamping
    /// out-of-range values.
    pub fn normalized(&self, index: usize) -> impl Iterator<Item = f32> + '_ {
        self.channel(index).map(|v| (v as f32).clamp(0.0, DISPLAY_RANGE) / DISPLAY_RANGE)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a SampleRecord;
    type IntoIter = std::slice::Iter<'a, SampleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(values: &[u16], total: u64) -> Snapshot {
        let records: Vec<_> =
            values.iter().enumerate().map(|(i, &v)| SampleRecord::new(i as u8, [v, v])).collect();
        Snapshot::new(records.into_boxed_slice(), total)
    }

    #[test]
    fn filled_is_capped_by_length() {
        assert_eq!(snapshot(&[0, 0, 5], 1).filled(), 1);
        assert_eq!(snapshot(&[1, 2, 3], 1000).filled(), 3);
    }

    #[test]
    fn normalized_clamps_to_display_range() {
        let snap = snapshot(&[0, 512, 1024, 4000], 4);
        let values: Vec<f32> = snap.normalized(0).collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn channel_out_of_range_reads_zero() {
        let snap = snapshot(&[9, 9], 2);
        assert!(snap.channel(5).all(|v| v == 0));
    }
}
