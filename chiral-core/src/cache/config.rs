//! Configuration for the cache system

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Namespace used for every entry the client writes
pub const DEFAULT_NAMESPACE: &str = "chiral_static";

/// Minimum TTL accepted from user configuration
pub const MIN_TTL_SECS: u64 = 60;

/// Default TTL: 1 hour
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Cache behaviour for one orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether lookups consult and populate the cache
    pub enabled: bool,

    /// Time-to-live for entries written by the orchestrator
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl CacheSettings {
    /// Create a new builder for cache settings
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    /// Settings with caching turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.ttl.is_zero() {
            return Err("cache ttl must be greater than 0".to_string());
        }
        Ok(())
    }

    /// TTL in whole seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }
}

/// Builder for cache settings
#[derive(Debug, Default)]
pub struct CacheSettingsBuilder {
    enabled: Option<bool>,
    ttl: Option<Duration>,
}

impl CacheSettingsBuilder {
    /// Enable or disable caching
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the entry TTL
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the entry TTL in seconds, raised to the 60 second minimum
    pub fn ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = Some(Duration::from_secs(secs.max(MIN_TTL_SECS)));
        self
    }

    /// Build the cache settings
    pub fn build(self) -> CacheSettings {
        let defaults = CacheSettings::default();

        CacheSettings {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            ttl: self.ttl.unwrap_or(defaults.ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.ttl, Duration::from_secs(3600));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_builder_clamps_ttl_secs() {
        let settings = CacheSettings::builder().ttl_secs(10).build();
        assert_eq!(settings.ttl_secs(), 60);

        let settings = CacheSettings::builder().ttl_secs(7200).enabled(false).build();
        assert_eq!(settings.ttl_secs(), 7200);
        assert!(!settings.enabled);
    }

    #[test]
    fn test_validation() {
        let invalid = CacheSettings::builder().ttl(Duration::ZERO).build();
        assert!(invalid.validate().is_err());

        let disabled = CacheSettings {
            enabled: false,
            ttl: Duration::ZERO,
        };
        assert!(disabled.validate().is_ok());
    }
}
