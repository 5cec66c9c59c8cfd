//! Consumer side of the snapshot handoff.
//!
//! Drawing is out of scope for this crate; a renderer only implements
//! [`SnapshotConsumer`]. [`run_consumer`] drives it from a snapshot stream:
//! snapshots arriving while the consumer is not ready (for example before its
//! surface exists) are dropped rather than queued.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::types::Snapshot;

/// Receives ring snapshots for display.
pub trait SnapshotConsumer: Send {
    /// Whether the consumer can draw right now.
    fn is_ready(&self) -> bool {
        true
    }

    /// Called with each delivered snapshot. The snapshot is shared and must
    /// not be mutated; clamping and scaling are up to the consumer.
    fn on_snapshot_ready(&mut self, snapshot: &Snapshot);
}

/// Counters returned when a consumer loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Feed snapshots to `consumer` until the stream ends or `cancel` fires.
pub async fn run_consumer<S, C>(
    snapshots: S,
    consumer: &mut C,
    cancel: CancellationToken,
) -> ConsumerStats
where
    S: Stream<Item = Arc<Snapshot>>,
    C: SnapshotConsumer + ?Sized,
{
    let mut snapshots = std::pin::pin!(snapshots);
    let mut stats = ConsumerStats::default();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = snapshots.next() => next,
        };

        let Some(snapshot) = next else {
            break;
        };

        if consumer.is_ready() {
            consumer.on_snapshot_ready(&snapshot);
            stats.delivered += 1;
        } else {
            trace!("Consumer not ready, snapshot dropped");
            stats.dropped += 1;
        }
    }

    debug!(delivered = stats.delivered, dropped = stats.dropped, "Consumer loop ended");
    stats
}
