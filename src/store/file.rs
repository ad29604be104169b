// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! File-backed Durable Store.
//!
//! One JSON object file holds the whole key-value map. The map is loaded at
//! [`FileStore::open`] and rewritten on every mutation through a temp-file
//! rename, so a crash mid-write leaves the previous snapshot intact. All
//! mutations run behind one mutex: writes to the same key are serialized and
//! the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use super::traits::{DurableStore, StoreError};

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) a store at `path`.
    ///
    /// A missing file yields an empty store. A corrupt file is logged and
    /// also yields an empty store: losing the mirror is preferable to
    /// failing startup.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt store file, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Number of persisted entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    // Caller must hold the entries lock: the write-then-rename below is what
    // keeps same-key writes serialized.
    async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries).map_err(|e| StoreError::Serialization {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw.as_bytes())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        if entries.len() != before {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}
