//! Client facade tying configuration, fetching, caching and rendering together

use crate::display::{RenderState, Renderer};
use crate::i18n::{I18n, Translator};
use chiral_core::config::clamp_count;
use chiral_core::{
    CacheStats, ClientConfig, ContentGateway, DisabledStore, ExpiringCache,
    FetchOrchestrator, FileStore, KeyValueStore, RelatedItem, Result,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// File name of the persistent cache inside the data directory
pub const CACHE_FILE_NAME: &str = "cache.json";

/// Summary of the client and its effective configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub version: String,
    pub hub_url: String,
    pub network_name: String,
    pub count: usize,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_available: bool,
    pub locale: String,
    pub available_locales: Vec<String>,
}

pub struct ChiralClient {
    config: ClientConfig,
    orchestrator: FetchOrchestrator<ContentGateway>,
    i18n: Arc<I18n>,
    renderer: Renderer,
}

impl ChiralClient {
    /// Build a client over an explicit key-value store
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let gateway = ContentGateway::from_config(&config)?;
        let cache = ExpiringCache::new(store);
        let i18n = Arc::new(I18n::from_config(&config.i18n));
        let renderer = Renderer::new(i18n.clone(), config.hub_url.clone(), &config.display);

        info!(
            "Chiral client ready (hub: {}, count: {}, cache: {})",
            config.hub_url,
            config.display.count,
            if config.display.enable_cache { "on" } else { "off" }
        );

        Ok(Self {
            config,
            orchestrator: FetchOrchestrator::new(gateway, cache),
            i18n,
            renderer,
        })
    }

    /// Build a client persisting its cache under `data_dir`
    ///
    /// A cache file that cannot be opened disables caching instead of
    /// failing the client.
    pub fn from_config_with_data_dir(config: ClientConfig, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CACHE_FILE_NAME);
        let store: Arc<dyn KeyValueStore> = match FileStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Cannot open cache at {:?}, caching disabled: {}", path, e);
                Arc::new(DisabledStore::new(e.to_string()))
            }
        };
        Self::new(config, store)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn translator(&self) -> &I18n {
        &self.i18n
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Related items for `page_url`; `count` defaults to the configured one
    pub async fn related(&self, page_url: &str, count: Option<usize>) -> Result<Vec<RelatedItem>> {
        let page_url = page_url.trim();
        let count = count
            .map(|c| clamp_count(i64::try_from(c).unwrap_or(i64::MAX)))
            .unwrap_or(self.config.display.count);

        self.orchestrator
            .resolve(
                page_url,
                &self.config.hub_url,
                count,
                &self.config.cache_settings(),
            )
            .await
    }

    /// Look up and render related content; failures render as states
    pub async fn render(&self, page_url: &str, count: Option<usize>) -> String {
        let state = RenderState::from_result(self.related(page_url, count).await);
        self.renderer.render(&state)
    }

    pub async fn test_connection(&self) -> bool {
        self.orchestrator.test_connectivity().await
    }

    pub fn clear_cache(&self) -> usize {
        self.orchestrator.clear_cache()
    }

    pub fn clean_expired_cache(&self) -> usize {
        self.orchestrator.clean_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.orchestrator.cache_stats()
    }

    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hub_url: self.config.hub_url.clone(),
            network_name: self.orchestrator.source().network_name().to_string(),
            count: self.config.display.count,
            cache_enabled: self.config.display.enable_cache,
            cache_ttl_secs: self.config.display.cache_ttl_secs,
            cache_available: self.orchestrator.cache().is_available(),
            locale: self.i18n.locale().to_string(),
            available_locales: self.i18n.available_locales(),
        }
    }
}
