// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Metrics instrumentation for the offline sync core.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! app chooses the exporter.
//!
//! # Metric Naming Convention
//! - `ledger_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one enqueued action
pub fn record_enqueue(kind: &str) {
    counter!(
        "ledger_sync_enqueued_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the classification of one drained item
pub fn record_drain_outcome(outcome: &'static str) {
    counter!(
        "ledger_sync_drain_items_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one full drain walk
pub fn record_drain_duration(duration: Duration) {
    histogram!("ledger_sync_drain_seconds").record(duration.as_secs_f64());
}

/// Set current pending queue depth
pub fn set_queue_depth(count: usize) {
    gauge!("ledger_sync_queue_depth").set(count as f64);
}

/// Record a cache read (`hit`, `stale`, or `miss`)
pub fn record_cache_access(result: &'static str) {
    counter!(
        "ledger_sync_cache_reads_total",
        "result" => result
    )
    .increment(1);
}

/// Record an absorbed persistence failure
pub fn record_persistence_error(component: &'static str) {
    counter!(
        "ledger_sync_persistence_errors_total",
        "component" => component
    )
    .increment(1);
}
