//! Remote content gateway
//!
//! Resolves related content for a page in three linear stages:
//!
//! 1. **Resolve identifier**: ask the directory API for the content record
//!    whose `chiral_source_url` metadata equals the page URL.
//! 2. **Fetch related ids**: ask the hub's proxy endpoint for the ids
//!    related to that record.
//! 3. **Fetch details**: load every related item from the directory API
//!    concurrently; items that fail are dropped.
//!
//! Stages 1 and 2 fail terminally with a classified [`GatewayError`].

pub mod normalize;
pub mod types;

use crate::config::{validate_base_url, ClientConfig, DEFAULT_DIRECTORY_API_BASE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{ChiralError, GatewayError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use normalize::{network_name, normalize_item, strip_html_tags};
pub use types::{ItemId, PostDetail, RelatedItem};

use types::{DirectorySearchResponse, RelatedIdsResponse};

/// Hub proxy path answering related-id queries
pub const RELATED_IDS_PATH: &str = "/wp-json/chiral-network/v1/related-post-ids";

/// Post type holding network content records
const CONTENT_POST_TYPE: &str = "chiral_data";

/// Fields requested for item details
const DETAIL_FIELDS: &str = "ID,title,URL,excerpt,date,featured_image,tags,categories,author,metadata";

/// Source of related content for the orchestrator
#[async_trait]
pub trait RelatedContentSource: Send + Sync {
    /// Run the full resolution for `page_url`, returning at most `count` items
    async fn fetch_related(&self, page_url: &str, count: usize) -> std::result::Result<Vec<RelatedItem>, GatewayError>;

    /// Probe the hub; any HTTP response counts as reachable
    async fn test_connectivity(&self) -> bool;
}

/// HTTP gateway to the directory API and one hub
#[derive(Debug, Clone)]
pub struct ContentGateway {
    client: Client,
    hub_url: String,
    hub_domain: String,
    directory_base: String,
    network_name: String,
}

impl ContentGateway {
    /// Create a gateway for `hub_url` using the public directory API
    pub fn new(hub_url: &str) -> Result<Self> {
        Self::with_options(
            hub_url,
            DEFAULT_DIRECTORY_API_BASE,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a gateway from validated client configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::with_options(
            &config.hub_url,
            &config.directory_api_base,
            config.request_timeout(),
        )
    }

    /// Create a gateway with an explicit directory base and transport timeout
    pub fn with_options(hub_url: &str, directory_base: &str, timeout: Duration) -> Result<Self> {
        let hub_url = validate_base_url(Some(hub_url), "hubUrl")?;
        let directory_base = validate_base_url(Some(directory_base), "directoryApiBase")?;

        let hub_domain = url::Url::parse(&hub_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| ChiralError::ConfigInvalid("hubUrl has no host".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chiral-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChiralError::ConfigInvalid(format!("cannot build HTTP client: {}", e)))?;

        info!("Content gateway ready (hub: {}, directory: {})", hub_url, directory_base);

        Ok(Self {
            client,
            network_name: network_name(&hub_url),
            hub_url,
            hub_domain,
            directory_base,
        })
    }

    /// Hub URL without trailing slash
    pub fn hub_url(&self) -> &str {
        &self.hub_url
    }

    /// Host of the hub URL; directory queries are scoped to it
    pub fn hub_domain(&self) -> &str {
        &self.hub_domain
    }

    /// Human-readable network label
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    fn posts_url(&self) -> String {
        format!("{}/sites/{}/posts", self.directory_base, self.hub_domain)
    }

    /// Detail URL for `id`, with the id encoded as a single path segment
    fn detail_url(&self, id: &ItemId) -> std::result::Result<url::Url, GatewayError> {
        let mut url = url::Url::parse(&self.posts_url())
            .map_err(|e| GatewayError::transport(format!("invalid posts URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::transport("directory base cannot hold path segments"))?
            .push(&id.to_string());
        Ok(url)
    }

    fn related_ids_url(&self) -> String {
        format!("{}{}", self.hub_url, RELATED_IDS_PATH)
    }

    /// Stage 1: identifier of the content record for `page_url`
    pub async fn find_content_id(&self, page_url: &str) -> std::result::Result<ItemId, GatewayError> {
        let response = self
            .client
            .get(self.posts_url())
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("type", CONTENT_POST_TYPE),
                ("meta_key", normalize::SOURCE_URL_META_KEY),
                ("meta_value", page_url),
                ("_fields", "ID"),
                ("number", "1"),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to find content id for {}: {}", page_url, e);
                GatewayError::from(e)
            })?;

        let response = ensure_success(response, "directory API")?;
        let body: DirectorySearchResponse = decode(response).await?;

        body.posts
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|post| post.id)
            .filter(|id| !id.is_blank())
            .ok_or_else(|| {
                debug!("No content record for {}", page_url);
                GatewayError::NotFound
            })
    }

    /// Stage 2: related identifiers from the hub, in hub order
    ///
    /// A 404 means "nothing related" and yields an empty list.
    pub async fn related_ids(
        &self,
        content_id: &ItemId,
        count: usize,
        page_url: &str,
    ) -> std::result::Result<Vec<ItemId>, GatewayError> {
        let mut request = self
            .client
            .get(self.related_ids_url())
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("cpt_id", content_id.to_string()),
                ("count", count.to_string()),
            ]);

        if let Some(referer) = referer_for(page_url) {
            request = request.header(header::REFERER, referer);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Failed to get related ids from hub: {}", e);
            GatewayError::from(e)
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Hub has no related items for {}", content_id);
                return Ok(Vec::new());
            }
            StatusCode::FORBIDDEN => return Err(GatewayError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(GatewayError::RateLimited),
            _ => {}
        }

        let response = ensure_success(response, "hub")?;
        let body: RelatedIdsResponse = decode(response).await?;
        Ok(body.related_post_ids.unwrap_or_default())
    }

    /// Stage 3 for one item: raw details from the directory API
    pub async fn item_details(&self, id: &ItemId) -> std::result::Result<PostDetail, GatewayError> {
        let response = self
            .client
            .get(self.detail_url(id)?)
            .header(header::ACCEPT, "application/json")
            .query(&[("fields", DETAIL_FIELDS)])
            .send()
            .await
            .map_err(GatewayError::from)?;

        let response = ensure_success(response, "directory API")?;
        decode(response).await
    }

    /// Stage 3: fetch every item concurrently and keep input order
    ///
    /// Failed items are logged and dropped; the stage itself never fails.
    pub async fn fetch_details(&self, ids: &[ItemId]) -> Vec<RelatedItem> {
        let fetches = ids.iter().map(|id| async move {
            match self.item_details(id).await {
                Ok(detail) => {
                    let item = normalize_item(detail, &self.network_name);
                    if item.is_none() {
                        warn!("Invalid details received for item {}", id);
                    }
                    item
                }
                Err(e) => {
                    warn!("Failed to fetch details for item {}: {}", id, e);
                    None
                }
            }
        });

        // join_all yields results in input order regardless of completion order
        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Run all three stages for `page_url`
    pub async fn related_items(
        &self,
        page_url: &str,
        count: usize,
    ) -> std::result::Result<Vec<RelatedItem>, GatewayError> {
        let content_id = self.find_content_id(page_url).await?;
        debug!("Resolved {} to content id {}", page_url, content_id);

        let ids = self.related_ids(&content_id, count, page_url).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = self.fetch_details(&ids).await;
        items.truncate(count);

        debug!("Fetched {} of {} related items", items.len(), ids.len());
        Ok(items)
    }

    /// Probe the hub's related-ids endpoint
    pub async fn probe(&self) -> bool {
        let result = self
            .client
            .get(self.related_ids_url())
            .header(header::ACCEPT, "application/json")
            .query(&[("cpt_id", "1"), ("count", "1")])
            .send()
            .await;

        match result {
            Ok(response) => {
                debug!("Hub answered connectivity probe with {}", response.status());
                true
            }
            Err(e) => {
                warn!("Connection test failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl RelatedContentSource for ContentGateway {
    async fn fetch_related(&self, page_url: &str, count: usize) -> std::result::Result<Vec<RelatedItem>, GatewayError> {
        self.related_items(page_url, count).await
    }

    async fn test_connectivity(&self) -> bool {
        self.probe().await
    }
}

fn ensure_success(response: Response, service: &str) -> std::result::Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = status.canonical_reason().unwrap_or("Unexpected status");
    warn!("{} error: {} {}", service, status.as_u16(), reason);
    Err(GatewayError::status(status.as_u16(), reason))
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> std::result::Result<T, GatewayError> {
    let status = response.status().as_u16();
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::status(status, format!("invalid response body: {}", e)))
}

/// Origin of the page, sent as referrer so the hub can check its allow-list
fn referer_for(page_url: &str) -> Option<String> {
    let origin = url::Url::parse(page_url).ok()?.origin();
    origin
        .is_tuple()
        .then(|| format!("{}/", origin.ascii_serialization()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_trims_hub_url() {
        let gateway = ContentGateway::new("https://hub.example///").unwrap();
        assert_eq!(gateway.hub_url(), "https://hub.example");
        assert_eq!(gateway.hub_domain(), "hub.example");
        assert_eq!(gateway.network_name(), "hub.example");
        assert_eq!(
            gateway.related_ids_url(),
            "https://hub.example/wp-json/chiral-network/v1/related-post-ids"
        );
        assert_eq!(
            gateway.posts_url(),
            "https://public-api.wordpress.com/rest/v1.1/sites/hub.example/posts"
        );
    }

    #[test]
    fn test_detail_url_encodes_text_ids() {
        let gateway = ContentGateway::new("https://hub.example").unwrap();

        let url = gateway.detail_url(&ItemId::Text("a/b?c#d".to_string())).unwrap();
        assert!(url.as_str().ends_with("/sites/hub.example/posts/a%2Fb%3Fc%23d"));
        assert_eq!(url.query(), None);

        let url = gateway.detail_url(&ItemId::Int(5)).unwrap();
        assert!(url.as_str().ends_with("/sites/hub.example/posts/5"));
    }

    #[test]
    fn test_gateway_rejects_invalid_hub() {
        assert!(matches!(
            ContentGateway::new(""),
            Err(ChiralError::ConfigInvalid(_))
        ));
        assert!(matches!(
            ContentGateway::new("not-a-url"),
            Err(ChiralError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_referer_is_page_origin() {
        assert_eq!(
            referer_for("https://site.example:8080/blog/post-1?x=1").as_deref(),
            Some("https://site.example:8080/")
        );
        assert_eq!(referer_for("not a url"), None);
    }
}
