// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Durable, ordered queue of pending mutations.
//!
//! Append-only between drains: the UI enqueues while offline (or after a
//! failed submit) and the sync engine replaces the queue wholesale after
//! each drain walk. The full queue is persisted as one serialized snapshot
//! under a single namespaced key, overwritten on every mutation.
//!
//! Persistence failures never surface to the caller: the in-memory queue is
//! the source of truth for the session and the store is a restart mirror.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::action::{ActionDraft, ActionStatus, QueuedAction};
use crate::config::OfflineConfig;
use crate::events::{EventBus, SyncEvent};
use crate::metrics;
use crate::store::traits::DurableStore;

pub struct ActionQueue {
    actions: Mutex<Vec<QueuedAction>>,
    store: Arc<dyn DurableStore>,
    key: String,
    /// Serializes snapshot writes so a slow write cannot be overtaken by a
    /// later one (last write wins, in issue order).
    persist_lock: tokio::sync::Mutex<()>,
    events: EventBus,
}

impl ActionQueue {
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, config: &OfflineConfig, events: EventBus) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            store,
            key: config.queue_key.clone(),
            persist_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Append a new pending action and persist the updated snapshot.
    ///
    /// Infallible from the caller's view: a failed store write is logged
    /// and the action lives on in memory for this session. Emits
    /// [`SyncEvent::ActionQueued`] exactly once.
    pub async fn enqueue(&self, draft: ActionDraft) -> QueuedAction {
        let action = QueuedAction::new(draft);

        let depth = {
            let mut actions = self.actions.lock();
            actions.push(action.clone());
            actions.len()
        };

        debug!(id = %action.id, kind = %action.kind, depth, "Action queued");
        metrics::record_enqueue(&action.kind);
        metrics::set_queue_depth(depth);

        self.persist().await;
        self.events.emit(SyncEvent::ActionQueued {
            id: action.id.clone(),
            kind: action.kind.clone(),
        });

        action
    }

    /// Cold-start hydration from the Durable Store.
    ///
    /// An absent or corrupt snapshot initializes an empty queue; this never
    /// fails.
    pub async fn load_from_store(&self) {
        let loaded: Vec<QueuedAction> = match self.store.get(&self.key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(actions) => actions,
                Err(e) => {
                    warn!(error = %e, "Corrupt queue snapshot, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Queue snapshot read failed, starting empty");
                metrics::record_persistence_error("queue");
                Vec::new()
            }
        };

        debug!(pending = loaded.len(), "Queue hydrated from durable store");
        metrics::set_queue_depth(loaded.len());
        *self.actions.lock() = loaded;
    }

    /// The current queue, sorted by timestamp ascending.
    ///
    /// Enqueue order should already be ascending, but clock skew across
    /// rapid taps is possible, so the sort is repeated defensively at read
    /// time. The sort is stable: same-millisecond actions keep their
    /// enqueue order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedAction> {
        let mut actions = self.actions.lock().clone();
        actions.sort_by_key(|a| a.timestamp);
        actions
    }

    /// Atomically replace the queue with the items a drain kept, and
    /// persist the new snapshot. Statuses reset to `Pending`.
    pub async fn replace_with(&self, mut remaining: Vec<QueuedAction>) {
        for action in &mut remaining {
            action.status = ActionStatus::Pending;
        }

        let depth = remaining.len();
        *self.actions.lock() = remaining;
        metrics::set_queue_depth(depth);

        self.persist().await;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    async fn persist(&self) {
        // Snapshot capture happens under the persist lock: a write holding
        // an older snapshot can never land after a newer one.
        let _guard = self.persist_lock.lock().await;

        let raw = {
            let actions = self.actions.lock();
            serde_json::to_string(&*actions)
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Queue snapshot serialization failed");
                metrics::record_persistence_error("queue");
                return;
            }
        };

        if let Err(e) = self.store.put(&self.key, &raw).await {
            warn!(error = %e, "Queue snapshot write failed, queue is memory-only this session");
            metrics::record_persistence_error("queue");
        }
    }
}
