//! Collaborator-visible notifications.
//!
//! The core raises events the UI layer turns into user feedback ("saved
//! offline", "sync complete"). Delivery is tokio broadcast: slow or absent
//! receivers never block the core, and a lagging receiver loses the oldest
//! events rather than stalling a drain.

use tokio::sync::broadcast;

/// Notification raised by the queue or the sync engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A mutation was deferred into the queue. Raised exactly once per
    /// successful enqueue — the UI's "saved offline" acknowledgment hook.
    ActionQueued { id: String, kind: String },
    /// A drain walk started over `pending` snapshotted actions.
    DrainStarted { pending: usize },
    /// The server rejected an action as permanently invalid (4xx); it was
    /// dropped from the queue and will not be retried.
    ActionDiscarded { id: String, status: u16 },
    /// Every action in the drain snapshot was applied remotely.
    SyncCompleted { applied: usize },
}

/// Shared handle to the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events raised from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. A send with no live receivers is fine.
    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}
