//! Fire-and-forget event fan-out for run observers.

use tokio::sync::broadcast;

use storesync_types::SyncEvent;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcast wrapper with at-most-once delivery and no replay.
///
/// Publishing with no subscribers is a no-op; slow subscribers drop the
/// oldest events (broadcast lag semantics).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish one event to every current subscriber.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe from this point forward; earlier events are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
