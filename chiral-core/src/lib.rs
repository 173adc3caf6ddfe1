//! # Chiral Core
//!
//! Related-content fetching for static sites that belong to a Chiral
//! network.
//!
//! ## Features
//!
//! - Three-stage hub protocol: page URL to content record, content record
//!   to related ids, related ids to display-ready items
//! - Expiring cache over a pluggable key-value store
//! - Cache-first orchestration with classified errors
//! - Client configuration from files, environment or code
//!
//! ## Fetching Related Content
//!
//! ```no_run
//! use chiral_core::{CacheSettings, ContentGateway, ExpiringCache, FetchOrchestrator, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = ContentGateway::new("https://hub.example.com")?;
//!     let cache = ExpiringCache::new(Arc::new(MemoryStore::new()));
//!     let orchestrator = FetchOrchestrator::new(gateway, cache);
//!
//!     let items = orchestrator
//!         .resolve(
//!             "https://blog.example.com/hello-world/",
//!             "https://hub.example.com",
//!             5,
//!             &CacheSettings::default(),
//!         )
//!         .await?;
//!
//!     for item in items {
//!         println!("{} ({})", item.title, item.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```no_run
//! use chiral_core::ClientConfigBuilder;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ClientConfigBuilder::from_file("chiral.yaml")?
//!         .with_env()
//!         .build()?;
//!
//!     println!("Hub: {}, count: {}", config.hub_url, config.display.count);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;

// Re-export main types for convenience
pub use cache::{
    related_posts_key, CacheEntry, CacheSettings, CacheStats, DisabledStore, ExpiringCache,
    FileStore, KeyValueStore, MemoryStore,
};
pub use config::{ClientConfig, ClientConfigBuilder, DisplayConfig, I18nConfig};
pub use error::{ChiralError, GatewayError, Result, StoreError};
pub use gateway::{ContentGateway, ItemId, RelatedContentSource, RelatedItem};
pub use orchestrator::FetchOrchestrator;
