//! Single-slot snapshot handoff from the capture task to consumers

use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

use crate::ring::SampleRing;
use crate::types::Snapshot;

/// Receiving side of the snapshot slot. `None` until the first publish.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

/// Publishes ring snapshots into a "latest value" slot.
///
/// Each publish replaces whatever the slot held, so a slow consumer only ever
/// sees the newest state and never a backlog. Publishing with no consumer
/// attached skips the copy entirely.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    slot: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
}

impl SnapshotPublisher {
    /// Create a publisher and an initial receiver
    pub fn channel() -> (Self, SnapshotReceiver) {
        let (tx, rx) = watch::channel(None);
        (Self { slot: Arc::new(tx) }, rx)
    }

    /// Attach another consumer
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.slot.subscribe()
    }

    /// Copy the ring and make it the latest snapshot.
    ///
    /// Returns false if nobody was listening and nothing was copied.
    pub fn publish<const N: usize>(&self, ring: &SampleRing<N>) -> bool {
        if self.slot.receiver_count() == 0 {
            return false;
        }

        let snapshot = Arc::new(ring.snapshot());
        trace!(total = snapshot.total_inserted(), "snapshot published");
        self.slot.send_replace(Some(snapshot));
        true
    }

    /// Latest published snapshot, if any
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.slot.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleRecord;

    #[test]
    fn only_latest_snapshot_is_visible() {
        let (publisher, mut rx) = SnapshotPublisher::channel();
        let mut ring: SampleRing<4> = SampleRing::new();

        for i in 0..10u8 {
            ring.insert(SampleRecord::new(i, [i as u16, 0]));
            assert!(publisher.publish(&ring));
        }

        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone().unwrap();
        assert_eq!(snap.latest().unwrap().sequence_id, 9);
        assert_eq!(snap.total_inserted(), 10);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn publish_without_consumers_is_dropped() {
        let (publisher, rx) = SnapshotPublisher::channel();
        drop(rx);
        let ring: SampleRing<4> = SampleRing::new();
        assert!(!publisher.publish(&ring));
        assert!(publisher.latest().is_none());

        let _late = publisher.subscribe();
        assert!(publisher.publish(&ring));
        assert!(publisher.latest().is_some());
    }

    #[test]
    fn published_snapshot_is_detached_from_ring() {
        let (publisher, rx) = SnapshotPublisher::channel();
        let mut ring: SampleRing<4> = SampleRing::new();
        ring.insert(SampleRecord::new(1, [1, 1]));
        publisher.publish(&ring);

        ring.insert(SampleRecord::new(2, [2, 2]));
        let held = rx.borrow().clone().unwrap();
        assert_eq!(held.latest().unwrap().sequence_id, 1);
    }
}
