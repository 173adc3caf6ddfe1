//! # Expiring Cache Layer
//!
//! Local caching of related-content results with per-entry time-to-live.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: each entry carries its own lifetime and is
//!   dropped the first time it is read after expiring
//! - **Pluggable Storage**: any [`KeyValueStore`] backend (in-memory, file,
//!   or a disabled store when the host forbids persistence)
//! - **Namespacing**: all keys live under one prefix so bulk clears never
//!   touch foreign data
//! - **Silent Degradation**: store failures turn into misses and no-ops
//!
//! ## Example
//!
//! ```rust
//! use chiral_core::cache::{ExpiringCache, MemoryStore, related_posts_key};
//! use std::sync::Arc;
//!
//! let cache = ExpiringCache::new(Arc::new(MemoryStore::new()));
//! let key = related_posts_key("https://site.example/post-1", "https://hub.example", 5);
//!
//! cache.set(&key, &vec!["cached".to_string()], 3600);
//!
//! if let Some(value) = cache.get::<Vec<String>>(&key) {
//!     println!("Cache hit: {:?}", value);
//! }
//! ```

pub mod config;
pub mod entry;
pub mod key;
pub mod kv;
pub mod store;
pub mod types;

pub use config::{CacheSettings, CacheSettingsBuilder, DEFAULT_NAMESPACE};
pub use entry::CacheEntry;
pub use key::{related_posts_key, simple_hash};
pub use kv::{DisabledStore, FileStore, KeyValueStore, MemoryStore};
pub use store::ExpiringCache;
pub use types::{CacheKey, CacheStats};
