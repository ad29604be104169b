//! Configuration for the offline sync core.
//!
//! # Example
//!
//! ```
//! use ledger_sync::OfflineConfig;
//!
//! // Minimal config (uses defaults)
//! let config = OfflineConfig::default();
//! assert_eq!(config.cache_ttl_secs, 300);
//!
//! // Full config
//! let config = OfflineConfig {
//!     cache_ttl_secs: 60,
//!     queue_key: "my_app_queue".into(),
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the offline sync core.
///
/// All fields have sensible defaults; a fresh [`OfflineConfig::default()`]
/// is a working configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
    /// Default cache freshness window in seconds (default: 300)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Durable Store key holding the serialized action queue snapshot
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Namespace prefix for cache entries in the Durable Store
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Capacity of the broadcast channel carrying [`crate::SyncEvent`]s
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_cache_ttl_secs() -> u64 { 300 }
fn default_queue_key() -> String { "offline_action_queue".to_string() }
fn default_cache_prefix() -> String { "cache:".to_string() }
fn default_event_capacity() -> usize { 64 }

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            queue_key: default_queue_key(),
            cache_prefix: default_cache_prefix(),
            event_capacity: default_event_capacity(),
        }
    }
}
