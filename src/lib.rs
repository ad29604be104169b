//! # Ledger Sync
//!
//! Offline-first synchronization core for a client-side finance tracker.
//!
//! Two subsystems carry the real work:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI / CRUD layer                      │
//! │  • writes → ActionQueue::enqueue (works offline)            │
//! │  • reads  → CacheStore::get_stale, then refresh + set       │
//! └─────────────────────────────────────────────────────────────┘
//!                │ mutations                    │ reads
//!                ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │       Action Queue       │   │         Cache Store          │
//! │  ordered, durable list   │   │  TTL map, stale-while-       │
//! │  of pending mutations    │   │  revalidate read paths       │
//! └──────────────────────────┘   └──────────────────────────────┘
//!                │ drain (online)               │ mirror
//!                ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │        Sync Engine       │   │        Durable Store         │
//! │  walks queue in order,   │   │  opaque key-value storage    │
//! │  classifies each outcome │   │  surviving process restarts  │
//! └──────────────────────────┘   └──────────────────────────────┘
//!                │
//!                ▼
//!        Remote API (trait)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledger_sync::{
//!     ActionDraft, ActionQueue, CacheStore, EventBus, InMemoryStore, Method,
//!     NetworkMonitor, OfflineConfig, RemoteApi, SyncEngine,
//! };
//! use serde_json::json;
//!
//! # async fn demo(remote: Arc<dyn RemoteApi>) {
//! let config = OfflineConfig::default();
//! let store = Arc::new(InMemoryStore::new());
//! let events = EventBus::new(config.event_capacity);
//!
//! let queue = Arc::new(ActionQueue::new(store.clone(), &config, events.clone()));
//! queue.load_from_store().await;
//!
//! let cache = Arc::new(CacheStore::new(store.clone(), &config));
//! cache.hydrate().await;
//!
//! let engine = SyncEngine::new(queue.clone(), remote, events.clone())
//!     .with_cache(cache.clone());
//!
//! // A mutation while offline: queued, persisted, applied on reconnect.
//! queue
//!     .enqueue(ActionDraft {
//!         kind: "add_expense".into(),
//!         method: Method::Post,
//!         path: "/transactions".into(),
//!         payload: json!({"amount": 12.50, "category": "coffee"}),
//!         affected_keys: vec!["dashboard".into(), "transactions_recent".into()],
//!     })
//!     .await;
//!
//! let monitor = NetworkMonitor::new(false);
//! engine.run(monitor.subscribe()).await;
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`queue`]: Durable, timestamp-ordered queue of pending mutations
//! - [`engine`]: Drains the queue against the remote API when online
//! - [`cache`]: TTL cache with fresh-only and stale-allowed read paths
//! - [`store`]: Durable key-value persistence (memory and file backends)
//! - [`remote`]: Remote API boundary and per-item outcome classification
//! - [`connectivity`]: Link + reachability folded into one online signal
//! - [`events`]: Broadcast notifications for the UI layer

pub mod action;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod remote;
pub mod store;

pub use action::{ActionDraft, ActionStatus, QueuedAction};
pub use cache::{CacheEntry, CacheStore};
pub use config::OfflineConfig;
pub use connectivity::{LinkReport, NetworkMonitor};
pub use engine::{DrainOutcome, DrainReport, EngineState, SyncEngine};
pub use events::{EventBus, SyncEvent};
pub use queue::ActionQueue;
pub use remote::{ApiRequest, ApiResponse, Method, Outcome, RemoteApi, RemoteError};
pub use store::file::FileStore;
pub use store::memory::InMemoryStore;
pub use store::traits::{DurableStore, StoreError};
