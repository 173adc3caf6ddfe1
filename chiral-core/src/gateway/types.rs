//! Wire types for the directory and hub APIs, and the normalized item

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a content record; the directory API emits integers, some
/// hubs emit strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl ItemId {
    /// `0` and `""` are placeholders, not identifiers
    pub fn is_blank(&self) -> bool {
        match self {
            ItemId::Int(id) => *id == 0,
            ItemId::Text(id) => id.trim().is_empty(),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(id) => write!(f, "{}", id),
            ItemId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId::Int(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::Text(id.to_string())
    }
}

/// A related item ready for display
///
/// Field names on the wire match the cache format shared with browser
/// clients of the same hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedItem {
    pub id: ItemId,
    pub title: String,
    /// Canonical source URL, `#` when unresolvable
    pub url: String,
    /// Plain-text summary
    #[serde(default)]
    pub excerpt: String,
    #[serde(rename = "featured_image_url", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "date", default)]
    pub published_at: Option<String>,
    /// `N/A` when unknown
    pub author_name: String,
    pub network_name: String,
}

impl RelatedItem {
    /// Whether the author is known
    pub fn has_author(&self) -> bool {
        !self.author_name.is_empty() && self.author_name != super::normalize::UNKNOWN_AUTHOR
    }
}

/// Stage 1 response: `{ posts: [{ ID }] }`
#[derive(Debug, Deserialize)]
pub(crate) struct DirectorySearchResponse {
    #[serde(default)]
    pub posts: Option<Vec<PostRef>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostRef {
    #[serde(rename = "ID")]
    pub id: Option<ItemId>,
}

/// Stage 2 response: `{ related_post_ids: [...] }`
#[derive(Debug, Deserialize)]
pub(crate) struct RelatedIdsResponse {
    #[serde(default)]
    pub related_post_ids: Option<Vec<ItemId>>,
}

/// Stage 3 response: one item's details from the directory API
///
/// The API sends `false` for absent values, so every field falls back to
/// `None` when its value has an unexpected shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostDetail {
    #[serde(rename = "ID", default, deserialize_with = "lenient_id")]
    pub id: Option<ItemId>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(rename = "URL", default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub featured_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_author")]
    pub author: Option<PostAuthor>,
    /// Array of `{ key, value }` objects; the API sends `false` when empty
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ItemId>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_author<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PostAuthor>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.is_object().then(|| PostAuthor {
        name: value.get("name").and_then(Value::as_str).map(str::to_string),
    }))
}
