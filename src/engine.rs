// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Sync engine: drains the action queue against the remote API.
//!
//! A two-state machine broadcast on a watch channel:
//!
//! ```text
//! Idle ──(online transition with pending work, or sync_now)──▶ Draining
//! Draining ──(snapshot fully walked once)──▶ Idle
//! ```
//!
//! One drain at a time: a trigger while Draining is dropped, never queued.
//! Within a drain, actions are applied strictly in timestamp order, one
//! in-flight request at a time — an update queued after an add for the same
//! transaction must not land out of order, and a just-recovered connection
//! should not be hit with parallel fan-out.
//!
//! Per-item outcomes are independent: one item's failure classifies that
//! item and the walk continues. Items classified retryable come back in the
//! next drain, still in timestamp order; there is no retry bound for them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::events::{EventBus, SyncEvent};
use crate::metrics;
use crate::queue::ActionQueue;
use crate::remote::{ApiRequest, Outcome, RemoteApi};

/// Engine state, observable via [`SyncEngine::state_receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No drain in progress
    Idle,
    /// A drain walk is running
    Draining,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Draining => write!(f, "Draining"),
        }
    }
}

/// Tally of one drain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Items in the snapshot this drain walked
    pub attempted: usize,
    /// Applied remotely and dropped from the queue
    pub applied: usize,
    /// Kept for the next drain (no response / 5xx)
    pub retained: usize,
    /// Dropped as permanently invalid (4xx)
    pub discarded: usize,
}

impl DrainReport {
    /// True when every snapshotted item was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.attempted == self.applied
    }
}

/// Result of a drain trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// This trigger ran the walk.
    Completed(DrainReport),
    /// A drain was already in flight; this trigger was a no-op.
    AlreadyDraining,
}

pub struct SyncEngine {
    queue: Arc<ActionQueue>,
    remote: Arc<dyn RemoteApi>,
    /// Cache handle for key-level invalidation of applied mutations
    cache: Option<Arc<CacheStore>>,
    events: EventBus,
    state: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,
    /// Mutual exclusion guard: at most one drain in flight
    draining: AtomicBool,
}

impl SyncEngine {
    #[must_use]
    pub fn new(queue: Arc<ActionQueue>, remote: Arc<dyn RemoteApi>, events: EventBus) -> Self {
        let (state_tx, state_rx) = watch::channel(EngineState::Idle);
        Self {
            queue,
            remote,
            cache: None,
            events,
            state: state_tx,
            state_rx,
            draining: AtomicBool::new(false),
        }
    }

    /// Attach a cache for key-level invalidation: when an action is applied
    /// remotely, its declared `affected_keys` are invalidated instead of
    /// clearing the whole cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Current engine state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions (Idle ↔ Draining).
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Trigger a drain now (manual sync).
    ///
    /// Re-entrant triggers while a drain is in flight return
    /// [`DrainOutcome::AlreadyDraining`] without queuing a second walk.
    pub async fn sync_now(&self) -> DrainOutcome {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress, trigger dropped");
            return DrainOutcome::AlreadyDraining;
        }

        self.state.send_replace(EngineState::Draining);
        let report = self.drain().await;
        self.state.send_replace(EngineState::Idle);
        self.draining.store(false, Ordering::Release);

        DrainOutcome::Completed(report)
    }

    /// React to connectivity transitions until the channel closes.
    ///
    /// Drains once immediately if already online with pending work, then on
    /// every offline→online transition with a non-empty queue.
    pub async fn run(&self, mut online: watch::Receiver<bool>) {
        let initially_online = *online.borrow_and_update();
        if initially_online && !self.queue.is_empty() {
            let _ = self.sync_now().await;
        }

        while online.changed().await.is_ok() {
            let is_online = *online.borrow_and_update();
            if is_online && !self.queue.is_empty() {
                let _ = self.sync_now().await;
            }
        }
    }

    /// One full walk over an immutable, timestamp-ordered snapshot.
    ///
    /// Enqueues landing during the walk are not part of this snapshot; they
    /// wait for the next trigger.
    async fn drain(&self) -> DrainReport {
        let snapshot = self.queue.snapshot();
        if snapshot.is_empty() {
            // No remote calls, no persistence write
            return DrainReport::default();
        }

        let started = Instant::now();
        let mut report = DrainReport {
            attempted: snapshot.len(),
            ..Default::default()
        };

        info!(pending = snapshot.len(), "Drain started");
        self.events.emit(SyncEvent::DrainStarted {
            pending: snapshot.len(),
        });

        let mut kept = Vec::new();
        for mut action in snapshot {
            action.status = crate::action::ActionStatus::Syncing;

            let request = ApiRequest {
                method: action.method,
                path: action.path.clone(),
                body: Some(action.payload.clone()),
            };
            let result = self.remote.request(&request).await;
            let outcome = Outcome::classify(&result);
            metrics::record_drain_outcome(outcome.as_str());

            match outcome {
                Outcome::Applied => {
                    report.applied += 1;
                    debug!(id = %action.id, kind = %action.kind, "Action applied");
                    if let Some(ref cache) = self.cache {
                        for key in &action.affected_keys {
                            cache.invalidate(key).await;
                        }
                    }
                }
                Outcome::Retry => {
                    report.retained += 1;
                    let detail = match &result {
                        Ok(response) => format!("status {}", response.status),
                        Err(e) => e.to_string(),
                    };
                    warn!(id = %action.id, kind = %action.kind, %detail, "Action kept for retry");
                    action.status = crate::action::ActionStatus::Failed;
                    kept.push(action);
                }
                Outcome::Discard => {
                    report.discarded += 1;
                    // Discard only arises from an Ok response
                    let status = result.as_ref().map(|r| r.status).unwrap_or_default();
                    warn!(id = %action.id, kind = %action.kind, status, "Action rejected by server, dropped");
                    self.events.emit(SyncEvent::ActionDiscarded {
                        id: action.id.clone(),
                        status,
                    });
                }
            }
        }

        self.queue.replace_with(kept).await;
        metrics::record_drain_duration(started.elapsed());

        info!(
            attempted = report.attempted,
            applied = report.applied,
            retained = report.retained,
            discarded = report.discarded,
            "Drain complete"
        );

        if report.is_clean() {
            self.events.emit(SyncEvent::SyncCompleted {
                applied: report.applied,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDraft;
    use crate::config::OfflineConfig;
    use crate::remote::{ApiResponse, Method, RemoteError};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Remote that answers each request with the next scripted status and
    /// records the paths it saw.
    struct ScriptedRemote {
        statuses: Mutex<Vec<u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRemote {
        fn new(statuses: Vec<u16>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl RemoteApi for ScriptedRemote {
        async fn request(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
            self.calls.lock().push(request.path.clone());
            let status = {
                let mut statuses = self.statuses.lock();
                if statuses.is_empty() {
                    200
                } else {
                    statuses.remove(0)
                }
            };
            if status == 0 {
                return Err(RemoteError::Transport("no route to host".to_string()));
            }
            Ok(ApiResponse {
                status,
                data: Value::Null,
            })
        }
    }

    fn draft(kind: &str, path: &str) -> ActionDraft {
        ActionDraft {
            kind: kind.to_string(),
            method: Method::Post,
            path: path.to_string(),
            payload: json!({"amount": 1}),
            affected_keys: vec![],
        }
    }

    async fn engine_with(
        statuses: Vec<u16>,
    ) -> (SyncEngine, Arc<ActionQueue>, Arc<ScriptedRemote>) {
        let events = EventBus::new(16);
        let queue = Arc::new(ActionQueue::new(
            Arc::new(InMemoryStore::new()),
            &OfflineConfig::default(),
            events.clone(),
        ));
        let remote = Arc::new(ScriptedRemote::new(statuses));
        let engine = SyncEngine::new(queue.clone(), remote.clone(), events);
        (engine, queue, remote)
    }

    #[tokio::test]
    async fn test_empty_queue_drain_is_noop() {
        let (engine, _queue, remote) = engine_with(vec![]).await;

        let outcome = engine.sync_now().await;

        assert_eq!(outcome, DrainOutcome::Completed(DrainReport::default()));
        assert!(remote.calls().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_applied_items_leave_the_queue() {
        let (engine, queue, _remote) = engine_with(vec![201, 200]).await;
        queue.enqueue(draft("add_expense", "/transactions")).await;
        queue.enqueue(draft("add_loan", "/loans")).await;

        let outcome = engine.sync_now().await;

        match outcome {
            DrainOutcome::Completed(report) => {
                assert_eq!(report.attempted, 2);
                assert_eq!(report.applied, 2);
                assert!(report.is_clean());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retained_client_error_dropped() {
        let (engine, queue, _remote) = engine_with(vec![503, 422, 201]).await;
        queue.enqueue(draft("a", "/a")).await;
        queue.enqueue(draft("b", "/b")).await;
        queue.enqueue(draft("c", "/c")).await;

        let outcome = engine.sync_now().await;

        match outcome {
            DrainOutcome::Completed(report) => {
                assert_eq!(report.retained, 1);
                assert_eq!(report.discarded, 1);
                assert_eq!(report.applied, 1);
                assert!(!report.is_clean());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Only the 503 item survives
        let remaining = queue.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, "a");
    }

    #[tokio::test]
    async fn test_transport_failure_is_retained() {
        // Status 0 makes the scripted remote fail at the transport level
        let (engine, queue, _remote) = engine_with(vec![0]).await;
        queue.enqueue(draft("add_expense", "/transactions")).await;

        engine.sync_now().await;

        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_walk_continues_past_failures() {
        let (engine, queue, remote) = engine_with(vec![0, 500, 200]).await;
        queue.enqueue(draft("a", "/a")).await;
        queue.enqueue(draft("b", "/b")).await;
        queue.enqueue(draft("c", "/c")).await;

        engine.sync_now().await;

        // All three were attempted despite the first two failing
        assert_eq!(remote.calls(), vec!["/a", "/b", "/c"]);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_drain_preserves_timestamp_order() {
        let (engine, queue, remote) = engine_with(vec![]).await;
        queue.enqueue(draft("add", "/transactions/add")).await;
        queue.enqueue(draft("update", "/transactions/update")).await;

        engine.sync_now().await;

        assert_eq!(
            remote.calls(),
            vec!["/transactions/add", "/transactions/update"]
        );
    }

    #[tokio::test]
    async fn test_retained_item_retried_in_next_drain() {
        let (engine, queue, remote) = engine_with(vec![503, 200]).await;
        queue.enqueue(draft("add_expense", "/transactions")).await;

        engine.sync_now().await;
        assert_eq!(queue.len(), 1);

        engine.sync_now().await;
        assert!(queue.is_empty());
        assert_eq!(remote.calls(), vec!["/transactions", "/transactions"]);
    }

    #[tokio::test]
    async fn test_clean_drain_emits_sync_completed() {
        let events = EventBus::new(16);
        let queue = Arc::new(ActionQueue::new(
            Arc::new(InMemoryStore::new()),
            &OfflineConfig::default(),
            events.clone(),
        ));
        let remote = Arc::new(ScriptedRemote::new(vec![200]));
        let engine = SyncEngine::new(queue.clone(), remote, events.clone());

        queue.enqueue(draft("add_expense", "/transactions")).await;
        let mut rx = events.subscribe();

        engine.sync_now().await;

        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            if let SyncEvent::SyncCompleted { applied } = event {
                assert_eq!(applied, 1);
                saw_completed = true;
            }
        }
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn test_discard_emits_event_no_completion() {
        let events = EventBus::new(16);
        let queue = Arc::new(ActionQueue::new(
            Arc::new(InMemoryStore::new()),
            &OfflineConfig::default(),
            events.clone(),
        ));
        let remote = Arc::new(ScriptedRemote::new(vec![422]));
        let engine = SyncEngine::new(queue.clone(), remote, events.clone());

        let action = queue.enqueue(draft("add_expense", "/transactions")).await;
        let mut rx = events.subscribe();

        engine.sync_now().await;

        let mut saw_discarded = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                SyncEvent::ActionDiscarded { id, status } => {
                    assert_eq!(id, action.id);
                    assert_eq!(status, 422);
                    saw_discarded = true;
                }
                SyncEvent::SyncCompleted { .. } => {
                    panic!("discard-only drain must not signal completion")
                }
                _ => {}
            }
        }
        assert!(saw_discarded);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_applied_action_invalidates_affected_keys() {
        let store = Arc::new(InMemoryStore::new());
        let config = OfflineConfig::default();
        let events = EventBus::new(16);
        let cache = Arc::new(CacheStore::new(store.clone(), &config));
        let queue = Arc::new(ActionQueue::new(store, &config, events.clone()));
        let remote = Arc::new(ScriptedRemote::new(vec![200]));
        let engine =
            SyncEngine::new(queue.clone(), remote, events).with_cache(cache.clone());

        cache.set("dashboard", json!({"total": 10})).await;
        cache.set("categories_all", json!(["food"])).await;

        queue
            .enqueue(ActionDraft {
                kind: "add_expense".to_string(),
                method: Method::Post,
                path: "/transactions".to_string(),
                payload: json!({"amount": 3}),
                affected_keys: vec!["dashboard".to_string()],
            })
            .await;

        engine.sync_now().await;

        // Only the declared key is invalidated
        assert!(cache.get_stale("dashboard").is_none());
        assert_eq!(cache.get_stale("categories_all"), Some(json!(["food"])));
    }

    #[tokio::test]
    async fn test_run_drains_on_online_transition() {
        let (engine, queue, remote) = engine_with(vec![]).await;
        let engine = Arc::new(engine);
        queue.enqueue(draft("add_expense", "/transactions")).await;

        let monitor = crate::connectivity::NetworkMonitor::new(false);
        let engine_clone = engine.clone();
        let rx = monitor.subscribe();
        let handle = tokio::spawn(async move { engine_clone.run(rx).await });

        monitor.set_online(true);

        // Wait for the drain triggered by the transition
        let deadline = Instant::now() + std::time::Duration::from_secs(2);
        while !queue.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(queue.is_empty());
        assert_eq!(remote.calls(), vec!["/transactions"]);

        drop(monitor);
        handle.await.unwrap();
    }
}
