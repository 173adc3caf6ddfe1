//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - the logical key, before namespacing
pub type CacheKey = String;

/// Snapshot of the cache's namespace, produced without mutating it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Whether the backing store accepted the availability probe
    pub available: bool,

    /// Number of entries under the namespace
    pub total_items: usize,

    /// Sum of stored value sizes in bytes
    pub total_size_bytes: usize,

    /// Entries that are expired or unparseable
    pub expired_items: usize,
}

impl CacheStats {
    /// Stats reported when the backing store is unavailable
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Entries that would still be served
    pub fn live_items(&self) -> usize {
        self.total_items.saturating_sub(self.expired_items)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.available {
            return write!(f, "CacheStats {{ available: false }}");
        }
        write!(
            f,
            "CacheStats {{ items: {}, expired: {}, size: {} bytes }}",
            self.total_items, self.expired_items, self.total_size_bytes
        )
    }
}
