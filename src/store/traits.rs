// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Serialization failed for '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

/// Abstract key-value persistence surviving process restarts.
///
/// The in-memory state of the queue and cache is the source of truth during
/// a session; this store is a write-through mirror for restart recovery.
/// Implementations must serialize writes to the same key internally so the
/// last write wins without interleaving.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Enumerate all entries whose key starts with `prefix`.
    /// Used at startup to hydrate the in-memory cache map.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Remove every entry under `prefix`.
    /// Default implementation scans then deletes one by one.
    async fn clear_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        for (key, _) in self.scan_prefix(prefix).await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}
