//! Error types for the Chiral client core
//!
//! Errors are layered: the key-value store, the remote gateway and the
//! public surface each have their own enum. Store errors never leave the
//! cache layer; gateway errors are classified and surfaced through
//! [`ChiralError`].

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::cache::KeyValueStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Persistence is disabled or the backend could not be opened
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Write would exceed the backend's capacity
    #[error("Quota exceeded: write needs {needed} bytes, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Filesystem error from a file-backed store
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Classified failures of the three-stage hub protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The page has no content record in the network
    #[error("Page data not found in Chiral network")]
    NotFound,

    /// The hub rejected the requesting domain
    #[error("Domain not authorized in Chiral network")]
    Unauthorized,

    /// The hub is throttling requests
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Non-success status or transport failure from either remote service
    #[error("{}", upstream_message(*status, message))]
    Upstream {
        /// HTTP status, absent when no response was received
        status: Option<u16>,
        message: String,
    },
}

fn upstream_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("Network error: {}", message),
    }
}

impl GatewayError {
    /// Build an upstream error from a response status
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status: Some(code),
            message: message.into(),
        }
    }

    /// Build an upstream error for a request that never got a response
    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GatewayError::status(status.as_u16(), err.to_string()),
            None => GatewayError::transport(err.to_string()),
        }
    }
}

/// Main error type surfaced to callers of the client
#[derive(Error, Debug)]
pub enum ChiralError {
    /// Stage 1 found no record for the page. Renderers show a dedicated
    /// "not linked into the network" state for this case.
    #[error("Page data not found in Chiral network")]
    NotLinked,

    /// Any other gateway failure
    #[error("Failed to fetch related content: {0}")]
    Fetch(#[source] GatewayError),

    /// Bad hub URL or missing required field, raised at construction
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),
}

impl From<GatewayError> for ChiralError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound => ChiralError::NotLinked,
            other => ChiralError::Fetch(other),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ChiralError>;
