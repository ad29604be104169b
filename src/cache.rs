// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Stale-while-revalidate read cache.
//!
//! An in-process map from logical key (`"dashboard"`, `"categories_all"`)
//! to timestamped payload, mirrored to the Durable Store for warm restarts.
//! Two read paths: [`CacheStore::get`] serves only fresh entries and lazily
//! evicts expired ones; [`CacheStore::get_stale`] ignores freshness so the
//! UI can render instantly while a refresh runs.
//!
//! The revalidate half of the pattern stays with the caller: render the
//! stale value, fetch, [`CacheStore::set`] on success. A failed refresh must
//! leave the stale entry untouched — this store offers no path that drops an
//! entry on a fetch error.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::action::now_millis;
use crate::config::OfflineConfig;
use crate::metrics;
use crate::store::traits::DurableStore;

/// One cached payload with its absolute freshness deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Last successfully fetched payload for this key
    pub data: Value,
    /// Epoch milliseconds after which the entry is stale (but still servable)
    pub expiry: i64,
}

impl CacheEntry {
    fn is_fresh(&self, now: i64) -> bool {
        now <= self.expiry
    }
}

/// In-process TTL cache mirrored to the Durable Store.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    store: Arc<dyn DurableStore>,
    prefix: String,
    default_ttl: Duration,
    /// Per-key write serialization for the durable mirror. Two writes to the
    /// same key land in issue order; the last one wins.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheStore {
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, config: &OfflineConfig) -> Self {
        Self {
            entries: DashMap::new(),
            store,
            prefix: config.cache_prefix.clone(),
            default_ttl: Duration::from_secs(config.cache_ttl_secs),
            write_locks: DashMap::new(),
        }
    }

    /// Rebuild the in-memory map from the Durable Store.
    ///
    /// Stale entries are hydrated too — they stay servable through
    /// [`get_stale`](Self::get_stale). Corrupt entries are logged and
    /// skipped.
    pub async fn hydrate(&self) {
        let persisted = match self.store.scan_prefix(&self.prefix).await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Cache hydration failed, starting cold");
                metrics::record_persistence_error("cache");
                return;
            }
        };

        let mut loaded = 0usize;
        for (key, raw) in persisted {
            // Strip the namespace prefix exactly once: a logical key may
            // itself start with the prefix and must round-trip unchanged.
            let logical = match key.strip_prefix(&self.prefix) {
                Some(logical) => logical.to_string(),
                None => {
                    warn!(key = %key, "Skipping key outside cache namespace");
                    continue;
                }
            };
            match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => {
                    self.entries.insert(logical, entry);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(key = %logical, error = %e, "Dropping corrupt cache entry");
                }
            }
        }
        debug!(loaded, "Cache hydrated from durable store");
    }

    /// Fresh-only read.
    ///
    /// Returns the payload only while `now <= expiry`. The first read that
    /// observes an expired entry evicts it from memory and from the durable
    /// mirror as a side effect (read-triggered cleanup, no background
    /// timer).
    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = now_millis();

        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                metrics::record_cache_access("hit");
                Some(entry.data.clone())
            }
            Some(entry) => {
                drop(entry);
                debug!(key, "Evicting expired cache entry");
                self.entries.remove(key);
                self.delete_mirror(key).await;
                metrics::record_cache_access("miss");
                None
            }
            None => {
                metrics::record_cache_access("miss");
                None
            }
        }
    }

    /// Freshness-ignoring read. Absent only if the key was never set or was
    /// cleared.
    #[must_use]
    pub fn get_stale(&self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) => {
                metrics::record_cache_access("stale");
                Some(entry.data.clone())
            }
            None => {
                metrics::record_cache_access("miss");
                None
            }
        }
    }

    /// Store a freshly fetched payload under the default TTL.
    pub async fn set(&self, key: &str, data: Value) {
        self.set_with_ttl(key, data, self.default_ttl).await;
    }

    /// Store a freshly fetched payload with an explicit TTL.
    ///
    /// Writes to the same key are serialized in issue order. A mirror write
    /// failure is absorbed (the session degrades to memory-only for this
    /// key).
    pub async fn set_with_ttl(&self, key: &str, data: Value, ttl: Duration) {
        // Memory insert and mirror write happen under the same per-key
        // lock, so the mirror always holds the entry memory last saw.
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let entry = CacheEntry {
            data,
            expiry: now_millis() + ttl.as_millis() as i64,
        };
        self.entries.insert(key.to_string(), entry.clone());

        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.put(&self.mirror_key(key), &raw).await {
                    warn!(key, error = %e, "Cache mirror write failed");
                    metrics::record_persistence_error("cache");
                }
            }
            Err(e) => {
                warn!(key, error = %e, "Cache entry serialization failed");
                metrics::record_persistence_error("cache");
            }
        }
    }

    /// Remove one entry from memory and the durable mirror.
    pub async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
        self.delete_mirror(key).await;
        // Drop the key's lock slot too, or the map grows for the lifetime
        // of the session. An in-flight writer still holds its Arc.
        self.write_locks.remove(key);
    }

    /// Remove all entries from memory and the durable mirror (e.g. logout).
    pub async fn clear(&self) {
        self.entries.clear();
        if let Err(e) = self.store.clear_prefix(&self.prefix).await {
            warn!(error = %e, "Cache mirror clear failed");
            metrics::record_persistence_error("cache");
        }
        self.write_locks.clear();
    }

    /// Number of entries currently held in memory (fresh or stale).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mirror_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    async fn delete_mirror(&self, key: &str) {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        if let Err(e) = self.store.delete(&self.mirror_key(key)).await {
            warn!(key, error = %e, "Cache mirror delete failed");
            metrics::record_persistence_error("cache");
        }
    }

    /// Insert an entry with an explicit expiry, bypassing the mirror.
    /// Test hook for expiry-boundary cases without wall-clock sleeps.
    #[cfg(test)]
    fn insert_with_expiry(&self, key: &str, data: Value, expiry: i64) {
        self.entries
            .insert(key.to_string(), CacheEntry { data, expiry });
    }

    #[cfg(test)]
    fn lock_slot_count(&self) -> usize {
        self.write_locks.len()
    }
}
