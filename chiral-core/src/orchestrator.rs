//! Fetch orchestration: cache first, gateway on miss, cache on success

use crate::cache::{related_posts_key, CacheSettings, CacheStats, ExpiringCache};
use crate::error::Result;
use crate::gateway::{RelatedContentSource, RelatedItem};
use tracing::{debug, info, warn};

/// Coordinates the expiring cache and a related-content source
///
/// Each `resolve` performs at most one cache read and one cache write, and
/// only touches the network on a miss. Concurrent resolves for the same key
/// may both miss and both write; the last write wins.
pub struct FetchOrchestrator<S> {
    source: S,
    cache: ExpiringCache,
}

impl<S: RelatedContentSource> FetchOrchestrator<S> {
    pub fn new(source: S, cache: ExpiringCache) -> Self {
        Self { source, cache }
    }

    /// The underlying content source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The underlying cache
    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    /// Related items for `page_url`, in hub order
    ///
    /// Fails with [`ChiralError::NotLinked`](crate::ChiralError::NotLinked)
    /// when the page has no record in the network, and with
    /// [`ChiralError::Fetch`](crate::ChiralError::Fetch) for every other
    /// gateway failure.
    pub async fn resolve(
        &self,
        page_url: &str,
        hub_url: &str,
        count: usize,
        settings: &CacheSettings,
    ) -> Result<Vec<RelatedItem>> {
        let key = settings
            .enabled
            .then(|| related_posts_key(page_url, hub_url, count));

        if let Some(key) = &key {
            if let Some(items) = self.cache.get::<Vec<RelatedItem>>(key) {
                debug!("Using cached related items for {}", page_url);
                return Ok(items);
            }
        }

        let items = self
            .source
            .fetch_related(page_url, count)
            .await
            .map_err(|e| {
                warn!("Failed to get related items for {}: {}", page_url, e);
                e
            })?;

        if let Some(key) = &key {
            if !self.cache.set_for(key, &items, settings.ttl) {
                debug!("Related items for {} were not cached", page_url);
            }
        }

        info!("Resolved {} related items for {}", items.len(), page_url);
        Ok(items)
    }

    /// Probe the content source
    pub async fn test_connectivity(&self) -> bool {
        self.source.test_connectivity().await
    }

    /// Remove every cached entry, returning the count removed
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Remove expired and corrupt entries, returning the count removed
    pub fn clean_expired(&self) -> usize {
        self.cache.clean_expired()
    }

    /// Read-only cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{KeyValueStore, MemoryStore};
    use crate::error::{ChiralError, GatewayError};
    use crate::gateway::ItemId;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Source that returns a fixed outcome and counts calls
    struct CountingSource {
        outcome: std::result::Result<Vec<RelatedItem>, GatewayError>,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(outcome: std::result::Result<Vec<RelatedItem>, GatewayError>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelatedContentSource for CountingSource {
        async fn fetch_related(
            &self,
            _page_url: &str,
            count: usize,
        ) -> std::result::Result<Vec<RelatedItem>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .clone()
                .map(|items| items.into_iter().take(count).collect())
        }

        async fn test_connectivity(&self) -> bool {
            true
        }
    }

    fn item(id: i64) -> RelatedItem {
        RelatedItem {
            id: ItemId::Int(id),
            title: format!("Item {}", id),
            url: format!("https://site.example/{}", id),
            excerpt: String::new(),
            thumbnail_url: None,
            published_at: None,
            author_name: "N/A".to_string(),
            network_name: "hub.example".to_string(),
        }
    }

    fn orchestrator(
        outcome: std::result::Result<Vec<RelatedItem>, GatewayError>,
    ) -> (Arc<MemoryStore>, FetchOrchestrator<CountingSource>) {
        let store = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(store.clone());
        (store, FetchOrchestrator::new(CountingSource::new(outcome), cache))
    }

    const PAGE: &str = "https://site.example/post-1";
    const HUB: &str = "https://hub.example";

    #[tokio::test]
    async fn test_second_resolve_is_served_from_cache() {
        let (_, orch) = orchestrator(Ok(vec![item(1), item(2)]));
        let settings = CacheSettings::default();

        let first = orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        let second = orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        let third = orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();

        assert_eq!(first, vec![item(1), item(2)]);
        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(orch.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_different_inputs_use_different_keys() {
        let (_, orch) = orchestrator(Ok(vec![item(1)]));
        let settings = CacheSettings::default();

        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        orch.resolve(PAGE, HUB, 6, &settings).await.unwrap();
        orch.resolve("https://site.example/post-2", HUB, 5, &settings)
            .await
            .unwrap();

        assert_eq!(orch.source().calls(), 3);
        assert_eq!(orch.cache_stats().total_items, 3);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let (store, orch) = orchestrator(Ok(vec![item(1)]));
        let settings = CacheSettings::disabled();

        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();

        assert_eq!(orch.source().calls(), 2);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entry_written_with_configured_ttl() {
        let (store, orch) = orchestrator(Ok(vec![item(1)]));
        let settings = CacheSettings::builder().ttl_secs(900).build();

        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();

        let key = orch.cache().storage_key(&related_posts_key(PAGE, HUB, 5));
        let raw = store.get_item(&key).unwrap().unwrap();
        let entry: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry["ttl"], 900_000);
        assert_eq!(entry["data"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let (_, orch) = orchestrator(Ok(Vec::new()));
        let settings = CacheSettings::default();

        assert!(orch.resolve(PAGE, HUB, 5, &settings).await.unwrap().is_empty());
        assert!(orch.resolve(PAGE, HUB, 5, &settings).await.unwrap().is_empty());
        assert_eq!(orch.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_distinguished() {
        let (store, orch) = orchestrator(Err(GatewayError::NotFound));

        let err = orch
            .resolve(PAGE, HUB, 5, &CacheSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChiralError::NotLinked));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_failures_are_fetch_errors() {
        for failure in [
            GatewayError::Unauthorized,
            GatewayError::RateLimited,
            GatewayError::status(500, "Internal Server Error"),
        ] {
            let (_, orch) = orchestrator(Err(failure.clone()));
            let err = orch
                .resolve(PAGE, HUB, 5, &CacheSettings::default())
                .await
                .unwrap_err();

            match err {
                ChiralError::Fetch(inner) => assert_eq!(inner, failure),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (_, orch) = orchestrator(Err(GatewayError::RateLimited));
        let settings = CacheSettings::default();

        assert!(orch.resolve(PAGE, HUB, 5, &settings).await.is_err());
        assert!(orch.resolve(PAGE, HUB, 5, &settings).await.is_err());
        assert_eq!(orch.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let (_, orch) = orchestrator(Ok(vec![item(1)]));
        let settings = CacheSettings::builder().ttl(Duration::from_millis(50)).build();

        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();

        assert_eq!(orch.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let (_, orch) = orchestrator(Ok(vec![item(1)]));
        let settings = CacheSettings::default();

        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();
        assert_eq!(orch.clear_cache(), 1);
        orch.resolve(PAGE, HUB, 5, &settings).await.unwrap();

        assert_eq!(orch.source().calls(), 2);
    }
}
