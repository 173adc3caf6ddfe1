//! Persisted cache entry with TTL support

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cache entry as written to the key-value store
///
/// Serialized as `{ "data": ..., "timestamp": <epoch ms>, "ttl": <ms> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,

    /// Creation time in epoch milliseconds
    pub timestamp: i64,

    /// Lifetime in milliseconds
    pub ttl: i64,
}

impl<T> CacheEntry<T> {
    /// Create an entry stamped with the current time
    pub fn new(data: T, ttl: Duration) -> Self {
        Self::stored_at(data, now_millis(), ttl)
    }

    /// Create an entry with an explicit creation time
    pub fn stored_at(data: T, timestamp: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp,
            ttl: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Check if the entry has expired at `now` (epoch ms)
    ///
    /// An entry is live while `now - timestamp <= ttl`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        u64::try_from(now_millis() - self.timestamp)
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
