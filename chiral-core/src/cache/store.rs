//! Expiring cache over a key-value store
//!
//! Failures of the backing store never reach callers: writes report
//! `false`, reads report a miss and bulk operations report what they
//! managed to do before the store gave up.

use crate::cache::{
    config::DEFAULT_NAMESPACE,
    entry::{now_millis, CacheEntry},
    kv::KeyValueStore,
    types::CacheStats,
};
use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROBE_KEY: &str = "__chiral_cache_test__";

/// TTL cache storing JSON payloads under a key namespace
///
/// This implementation provides:
/// - Per-entry time-to-live, checked on every read
/// - Lazy removal of expired and corrupt entries
/// - Namespace-scoped bulk clear and cleanup
/// - Read-only statistics
pub struct ExpiringCache {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    available: bool,
}

impl ExpiringCache {
    /// Create a cache over `store` using the default namespace
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    /// Create a cache over `store` using a custom namespace
    pub fn with_namespace(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let available = Self::probe(store.as_ref());

        if available {
            info!("Initialized expiring cache (namespace: {})", namespace);
        } else {
            warn!("Key-value store is not available, caching will be disabled");
        }

        Self {
            store,
            namespace,
            available,
        }
    }

    fn probe(store: &dyn KeyValueStore) -> bool {
        store
            .set_item(PROBE_KEY, "test")
            .and_then(|_| store.remove_item(PROBE_KEY))
            .is_ok()
    }

    /// Whether the backing store accepted the availability probe
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// The namespace prefixed to every key
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Physical store key for a logical cache key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}_{}", self.namespace, key)
    }

    fn prefix(&self) -> String {
        format!("{}_", self.namespace)
    }

    /// Store `payload` under `key` for `ttl_secs` seconds
    pub fn set<T: Serialize>(&self, key: &str, payload: &T, ttl_secs: u64) -> bool {
        self.set_for(key, payload, Duration::from_secs(ttl_secs))
    }

    /// Store `payload` under `key` for `ttl`
    pub fn set_for<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) -> bool {
        if !self.available {
            return false;
        }
        if ttl.is_zero() {
            warn!("Refusing to cache {} with zero ttl", key);
            return false;
        }

        let entry = CacheEntry::new(payload, ttl);
        let result = serde_json::to_string(&entry)
            .map_err(StoreError::from)
            .and_then(|raw| self.store.set_item(&self.storage_key(key), &raw));

        match result {
            Ok(()) => {
                debug!("Cached {} (ttl: {:?})", key, ttl);
                true
            }
            Err(e) => {
                warn!("Failed to set cache item {}: {}", key, e);
                false
            }
        }
    }

    /// Read the payload under `key` if a live entry exists
    ///
    /// Expired and unparseable entries are deleted and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.available {
            return None;
        }

        let storage_key = self.storage_key(key);
        let raw = match self.store.get_item(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to get cache item {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping corrupt cache entry {}: {}", key, e);
                self.delete(&storage_key);
                return None;
            }
        };

        if entry.is_expired_at(now_millis()) {
            debug!("Cache entry expired: {}", key);
            self.delete(&storage_key);
            return None;
        }

        let age = entry.age();
        match serde_json::from_value(entry.data) {
            Ok(payload) => {
                debug!("Cache hit: {} (age: {}s)", key, age.as_secs());
                Some(payload)
            }
            Err(e) => {
                warn!("Dropping cache entry {} with unexpected payload: {}", key, e);
                self.delete(&storage_key);
                None
            }
        }
    }

    /// Remove the entry under `key`
    pub fn remove(&self, key: &str) -> bool {
        if !self.available {
            return false;
        }
        self.delete(&self.storage_key(key))
    }

    /// Remove every entry under the namespace, returning how many were removed
    pub fn clear(&self) -> usize {
        if !self.available {
            return 0;
        }

        // Collect first: removing while walking indices would skip keys
        let keys = match self.namespaced_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to clear cache: {}", e);
                return 0;
            }
        };

        let cleared = keys.iter().filter(|key| self.delete(key)).count();
        info!("Cleared {} entries from cache", cleared);
        cleared
    }

    /// Remove every expired or corrupt entry under the namespace
    pub fn clean_expired(&self) -> usize {
        if !self.available {
            return 0;
        }

        let keys = match self.namespaced_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to clean expired items: {}", e);
                return 0;
            }
        };

        let now = now_millis();
        let mut cleaned = 0;
        for key in &keys {
            let stale = match self.store.get_item(key) {
                Ok(Some(raw)) => entry_is_stale(&raw, now),
                Ok(None) => false,
                Err(e) => {
                    warn!("Failed to read cache item {}: {}", key, e);
                    false
                }
            };
            if stale && self.delete(key) {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            debug!("Cleaned up {} expired entries", cleaned);
        }
        cleaned
    }

    /// Scan the namespace without modifying it
    pub fn stats(&self) -> CacheStats {
        if !self.available {
            return CacheStats::unavailable();
        }

        let mut stats = CacheStats {
            available: true,
            ..Default::default()
        };

        let keys = match self.namespaced_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to get cache stats: {}", e);
                return stats;
            }
        };

        let now = now_millis();
        for key in &keys {
            stats.total_items += 1;
            match self.store.get_item(key) {
                Ok(Some(raw)) => {
                    stats.total_size_bytes += raw.len();
                    if entry_is_stale(&raw, now) {
                        stats.expired_items += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read cache item {}: {}", key, e),
            }
        }

        stats
    }

    fn namespaced_keys(&self) -> Result<Vec<String>, StoreError> {
        let prefix = self.prefix();
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect())
    }

    fn delete(&self, storage_key: &str) -> bool {
        match self.store.remove_item(storage_key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove cache item {}: {}", storage_key, e);
                false
            }
        }
    }
}

/// Expired or unparseable entries both count as stale
fn entry_is_stale(raw: &str, now: i64) -> bool {
    serde_json::from_str::<CacheEntry<serde_json::Value>>(raw)
        .map(|entry| entry.is_expired_at(now))
        .unwrap_or(true)
}
