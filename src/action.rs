//! Queued mutation data structure.
//!
//! A [`QueuedAction`] is one user-initiated mutation captured while offline
//! (or after a failed submit). The `timestamp` is the sole ordering key; the
//! `id` stays unique even for same-millisecond enqueues thanks to a random
//! suffix.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::remote::Method;

/// Lifecycle status of a queued action.
///
/// `Syncing` and `Failed` are in-memory markers used during a drain walk;
/// the persisted snapshot always reads back as `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionStatus {
    /// Waiting to be applied against the remote API
    #[default]
    Pending,
    /// Currently in flight during a drain (never persisted)
    Syncing,
    /// Marked retryable during a drain, about to be filtered back into the queue
    Failed,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Syncing => write!(f, "Syncing"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// The caller-supplied half of a [`QueuedAction`].
///
/// CRUD wrappers capture the generic remote request (verb, path, body) plus
/// the cache keys the mutation invalidates once applied.
#[derive(Debug, Clone)]
pub struct ActionDraft {
    /// Mutation kind tag (e.g. `add_expense`, `delete_transaction`) — open set
    pub kind: String,
    /// HTTP-style verb for the remote request
    pub method: Method,
    /// Remote resource path (e.g. `/transactions`)
    pub path: String,
    /// Opaque payload specific to `kind`
    pub payload: Value,
    /// Cache keys to invalidate after this action is applied remotely
    pub affected_keys: Vec<String>,
}

/// A pending mutation persisted in the action queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Unique id: epoch-millis prefix + random suffix
    pub id: String,
    /// Mutation kind tag
    pub kind: String,
    /// Remote request verb
    pub method: Method,
    /// Remote request path
    pub path: String,
    /// Opaque payload
    pub payload: Value,
    /// Creation time in epoch milliseconds — the sole ordering key
    pub timestamp: i64,
    /// Cache keys invalidated when the action is applied
    #[serde(default)]
    pub affected_keys: Vec<String>,
    /// Transient drain-walk status; snapshots always persist as `Pending`
    #[serde(skip)]
    pub status: ActionStatus,
}

impl QueuedAction {
    /// Create a new pending action from a draft, assigning id and timestamp.
    #[must_use]
    pub fn new(draft: ActionDraft) -> Self {
        let timestamp = now_millis();
        Self {
            id: format!("{}-{}", timestamp, Uuid::new_v4().simple()),
            kind: draft.kind,
            method: draft.method,
            path: draft.path,
            payload: draft.payload,
            timestamp,
            affected_keys: draft.affected_keys,
            status: ActionStatus::Pending,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
