//! Key-value store backends for the expiring cache
//!
//! The trait mirrors the shape of an origin-scoped string store: string
//! keys and values, index-based enumeration and a finite capacity.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Default capacity for bounded stores (5 MiB)
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// A persistent string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Number of stored keys
    fn len(&self) -> Result<usize, StoreError>;

    /// Key at position `index` in the store's enumeration order
    fn key(&self, index: usize) -> Result<Option<String>, StoreError>;

    /// Check if the store holds no keys
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every key, collected by index before any caller mutates
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Ordered map with byte accounting, shared by the in-memory and file stores
#[derive(Debug, Default)]
struct BoundedMap {
    items: BTreeMap<String, String>,
    size_bytes: usize,
}

impl BoundedMap {
    fn from_items(items: BTreeMap<String, String>) -> Self {
        let size_bytes = items.iter().map(|(k, v)| k.len() + v.len()).sum();
        Self { items, size_bytes }
    }

    /// Size the map would have after writing `key` = `value`
    fn size_after_set(&self, key: &str, value: &str) -> usize {
        let existing = self.items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
        self.size_bytes - existing + key.len() + value.len()
    }

    fn set(&mut self, key: &str, value: &str, quota: Option<usize>) -> Result<(), StoreError> {
        let needed = self.size_after_set(key, value);
        if let Some(quota) = quota {
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        self.size_bytes = needed;
        Ok(())
    }

    /// Remove `key`, returning the value it held
    fn remove(&mut self, key: &str) -> Option<String> {
        let value = self.items.remove(key)?;
        self.size_bytes = self.size_bytes.saturating_sub(key.len() + value.len());
        Some(value)
    }

    fn key(&self, index: usize) -> Option<String> {
        self.items.keys().nth(index).cloned()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

/// In-memory store, optionally bounded by a byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BoundedMap>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create an unbounded in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory store that rejects writes past `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            inner: RwLock::new(BoundedMap::default()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes held (keys plus values)
    pub fn size_bytes(&self) -> usize {
        self.inner.read().map(|map| map.size_bytes).unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.set(key, value, self.quota_bytes)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(key);
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.items.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.key(index))
    }
}

/// Store persisted as a single JSON object on disk
///
/// The whole map is loaded on open and rewritten after every mutation,
/// through a temporary file renamed over the target.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: RwLock<BoundedMap>,
    quota_bytes: usize,
}

impl FileStore {
    /// Open (or lazily create) the store at `path` with the default quota
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_quota(path, DEFAULT_QUOTA_BYTES)
    }

    /// Open the store at `path` with a custom byte quota
    pub fn open_with_quota(path: impl Into<PathBuf>, quota_bytes: usize) -> Result<Self, StoreError> {
        let path = path.into();

        let items: BTreeMap<String, String> = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened file store at {:?} ({} keys)", path, items.len());

        Ok(Self {
            path,
            inner: RwLock::new(BoundedMap::from_items(items)),
            quota_bytes,
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BoundedMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string(&map.items)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let previous = map.items.get(key).cloned();
        map.set(key, value, Some(self.quota_bytes))?;

        if let Err(e) = self.persist(&map) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => {
                    let _ = map.set(key, &old, None);
                }
                None => {
                    map.remove(key);
                }
            }
            warn!("Failed to persist file store {:?}: {}", self.path, e);
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if let Some(previous) = map.remove(key) {
            if let Err(e) = self.persist(&map) {
                let _ = map.set(key, &previous, None);
                warn!("Failed to persist file store {:?}: {}", self.path, e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.items.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.key(index))
    }
}

/// Store for hosts that disable persistence: every operation fails
#[derive(Debug, Clone, Default)]
pub struct DisabledStore {
    reason: String,
}

impl DisabledStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Unavailable(if self.reason.is_empty() {
            "persistence disabled".to_string()
        } else {
            self.reason.clone()
        })
    }
}

impl KeyValueStore for DisabledStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(self.error())
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(self.error())
    }

    fn remove_item(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.error())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Err(self.error())
    }

    fn key(&self, _index: usize) -> Result<Option<String>, StoreError> {
        Err(self.error())
    }
}
