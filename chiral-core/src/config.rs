//! Client configuration: defaults, file and environment sources, validation
//!
//! Validation happens once, when the configuration is built. A bad hub URL
//! is reported as [`ChiralError::ConfigInvalid`] and never at call time.

use crate::cache::config::{CacheSettings, DEFAULT_TTL_SECS, MIN_TTL_SECS};
use crate::error::{ChiralError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default public directory API
pub const DEFAULT_DIRECTORY_API_BASE: &str = "https://public-api.wordpress.com/rest/v1.1";

/// Default page container id
pub const DEFAULT_CONTAINER_ID: &str = "chiral-related-posts";

/// Bounds for the number of related items per lookup
pub const MIN_COUNT: usize = 1;
pub const MAX_COUNT: usize = 20;
pub const DEFAULT_COUNT: usize = 5;

/// Default HTTP timeout enforced by the transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Validated client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Absolute hub URL without trailing slash
    pub hub_url: String,
    pub container_id: String,
    pub display: DisplayConfig,
    pub i18n: I18nConfig,
    pub directory_api_base: String,
    pub request_timeout_secs: u64,
}

/// Display and caching options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Related items per lookup, within [1, 20]
    pub count: usize,
    pub enable_cache: bool,
    /// Entry lifetime in seconds, at least 60
    #[serde(rename = "cacheTTL")]
    pub cache_ttl_secs: u64,
    pub show_thumbnails: bool,
    pub show_excerpts: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            enable_cache: true,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            show_thumbnails: true,
            show_excerpts: true,
        }
    }
}

/// Localization options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nConfig {
    pub locale: String,
    pub fallback_locale: String,
    /// locale -> message key -> template
    pub custom_messages: HashMap<String, HashMap<String, String>>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            custom_messages: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load a JSON or YAML (by `.yaml`/`.yml` extension) file.
    /// Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ClientConfigBuilder::from_file(path)?.build()
    }

    /// Build from `CHIRAL_*` environment variables (a `.env` file is honoured)
    pub fn from_env() -> Result<Self> {
        ClientConfigBuilder::default().with_env().build()
    }

    /// Host of the hub URL
    pub fn hub_domain(&self) -> String {
        url::Url::parse(&self.hub_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Cache behaviour derived from the display options
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.display.enable_cache,
            ttl: Duration::from_secs(self.display.cache_ttl_secs),
        }
    }

    /// Transport timeout for every request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Partial configuration as found in files; every field optional so a
/// document only needs the values it overrides
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    hub_url: Option<String>,
    container_id: Option<String>,
    display: RawDisplay,
    i18n: RawI18n,
    directory_api_base: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDisplay {
    count: Option<i64>,
    enable_cache: Option<bool>,
    #[serde(rename = "cacheTTL", alias = "cacheTtlSecs")]
    cache_ttl_secs: Option<i64>,
    show_thumbnails: Option<bool>,
    show_excerpts: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawI18n {
    locale: Option<String>,
    fallback_locale: Option<String>,
    custom_messages: Option<HashMap<String, HashMap<String, String>>>,
}

/// Builder for client configuration with validation
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    hub_url: Option<String>,
    container_id: Option<String>,
    count: Option<i64>,
    enable_cache: Option<bool>,
    cache_ttl_secs: Option<i64>,
    show_thumbnails: Option<bool>,
    show_excerpts: Option<bool>,
    locale: Option<String>,
    fallback_locale: Option<String>,
    custom_messages: Option<HashMap<String, HashMap<String, String>>>,
    directory_api_base: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl ClientConfigBuilder {
    /// Start from a JSON or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChiralError::ConfigInvalid(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let raw: RawConfig = if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| ChiralError::ConfigInvalid(format!("invalid YAML: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| ChiralError::ConfigInvalid(format!("invalid JSON: {}", e)))?
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(Self::default().merge_raw(raw))
    }

    fn merge_raw(mut self, raw: RawConfig) -> Self {
        self.hub_url = raw.hub_url.or(self.hub_url);
        self.container_id = raw.container_id.or(self.container_id);
        self.count = raw.display.count.or(self.count);
        self.enable_cache = raw.display.enable_cache.or(self.enable_cache);
        self.cache_ttl_secs = raw.display.cache_ttl_secs.or(self.cache_ttl_secs);
        self.show_thumbnails = raw.display.show_thumbnails.or(self.show_thumbnails);
        self.show_excerpts = raw.display.show_excerpts.or(self.show_excerpts);
        self.locale = raw.i18n.locale.or(self.locale);
        self.fallback_locale = raw.i18n.fallback_locale.or(self.fallback_locale);
        self.custom_messages = raw.i18n.custom_messages.or(self.custom_messages);
        self.directory_api_base = raw.directory_api_base.or(self.directory_api_base);
        self.request_timeout_secs = raw.request_timeout_secs.or(self.request_timeout_secs);
        self
    }

    /// Overlay `CHIRAL_*` environment variables, reading `.env` if present
    pub fn with_env(self) -> Self {
        dotenv::dotenv().ok();
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlay variables from an arbitrary lookup (used by `with_env`)
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(hub_url) = lookup("CHIRAL_HUB_URL") {
            self.hub_url = Some(hub_url);
        }
        if let Some(count) = lookup("CHIRAL_COUNT").and_then(|v| v.trim().parse().ok()) {
            self.count = Some(count);
        }
        if let Some(enabled) = lookup("CHIRAL_CACHE_ENABLED").and_then(|v| parse_bool(&v)) {
            self.enable_cache = Some(enabled);
        }
        if let Some(ttl) = lookup("CHIRAL_CACHE_TTL").and_then(|v| v.trim().parse().ok()) {
            self.cache_ttl_secs = Some(ttl);
        }
        if let Some(locale) = lookup("CHIRAL_LOCALE") {
            self.locale = Some(locale);
        }
        self
    }

    /// Set the hub URL (required)
    pub fn hub_url(mut self, url: impl Into<String>) -> Self {
        self.hub_url = Some(url.into());
        self
    }

    /// Set the page container id
    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    /// Set related items per lookup (clamped to [1, 20])
    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    /// Enable or disable caching
    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = Some(enable);
        self
    }

    /// Set the cache TTL in seconds (raised to 60)
    pub fn cache_ttl_secs(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    /// Show or hide thumbnails
    pub fn show_thumbnails(mut self, show: bool) -> Self {
        self.show_thumbnails = Some(show);
        self
    }

    /// Show or hide excerpts
    pub fn show_excerpts(mut self, show: bool) -> Self {
        self.show_excerpts = Some(show);
        self
    }

    /// Set the display locale
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the fallback locale
    pub fn fallback_locale(mut self, locale: impl Into<String>) -> Self {
        self.fallback_locale = Some(locale.into());
        self
    }

    /// Add a custom message template for `locale`
    pub fn custom_message(
        mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.custom_messages
            .get_or_insert_with(HashMap::new)
            .entry(locale.into())
            .or_default()
            .insert(key.into(), template.into());
        self
    }

    /// Point the client at a different directory API (tests, mirrors)
    pub fn directory_api_base(mut self, base: impl Into<String>) -> Self {
        self.directory_api_base = Some(base.into());
        self
    }

    /// Set the transport timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Validate, normalize and build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let hub_url = validate_base_url(self.hub_url.as_deref(), "hubUrl")?;

        let directory_api_base = match self.directory_api_base {
            Some(base) => validate_base_url(Some(&base), "directoryApiBase")?,
            None => DEFAULT_DIRECTORY_API_BASE.to_string(),
        };

        let count = clamp_count(self.count.unwrap_or(DEFAULT_COUNT as i64));
        let cache_ttl_secs = self
            .cache_ttl_secs
            .map(|ttl| ttl.max(MIN_TTL_SECS as i64) as u64)
            .unwrap_or(DEFAULT_TTL_SECS);

        let defaults = DisplayConfig::default();

        Ok(ClientConfig {
            hub_url,
            container_id: self
                .container_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTAINER_ID.to_string()),
            display: DisplayConfig {
                count,
                enable_cache: self.enable_cache.unwrap_or(defaults.enable_cache),
                cache_ttl_secs,
                show_thumbnails: self.show_thumbnails.unwrap_or(defaults.show_thumbnails),
                show_excerpts: self.show_excerpts.unwrap_or(defaults.show_excerpts),
            },
            i18n: {
                let custom_messages = self.custom_messages.unwrap_or_default();
                // Locales introduced by custom messages are kept verbatim
                let resolve = |tag: Option<&str>| match tag {
                    Some(tag) if custom_messages.contains_key(tag) => tag.to_string(),
                    tag => normalize_locale(tag.unwrap_or("en")),
                };
                I18nConfig {
                    locale: resolve(self.locale.as_deref()),
                    fallback_locale: resolve(self.fallback_locale.as_deref()),
                    custom_messages,
                }
            },
            directory_api_base,
            request_timeout_secs: self
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

/// Require an absolute http(s) URL with a host; trailing slashes are trimmed
pub fn validate_base_url(url: Option<&str>, field: &str) -> Result<String> {
    let trimmed = url.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ChiralError::ConfigInvalid(format!(
            "{} is required and cannot be empty",
            field
        )));
    }

    let cleaned = trimmed.trim_end_matches('/');
    let parsed = url::Url::parse(cleaned)
        .map_err(|_| ChiralError::ConfigInvalid(format!("{} must be a valid URL", field)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ChiralError::ConfigInvalid(format!(
            "{} must be an absolute http(s) URL",
            field
        )));
    }

    Ok(cleaned.to_string())
}

/// Clamp a requested count into [1, 20]
pub fn clamp_count(count: i64) -> usize {
    count.clamp(MIN_COUNT as i64, MAX_COUNT as i64) as usize
}

/// Built-in locale for a tag, if the tag is recognised
pub fn known_locale(locale: &str) -> Option<&'static str> {
    match locale.trim().to_lowercase().as_str() {
        "en" | "en-us" | "en-gb" => Some("en"),
        "zh" | "zh-cn" => Some("zh-CN"),
        "zh-tw" | "zh-hk" => Some("zh-TW"),
        "ja" | "ja-jp" => Some("ja"),
        _ => None,
    }
}

/// Map a locale tag onto a supported locale, `en` when unknown
pub fn normalize_locale(locale: &str) -> String {
    known_locale(locale).unwrap_or("en").to_string()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
