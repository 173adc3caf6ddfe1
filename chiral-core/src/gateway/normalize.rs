//! Mapping of directory API details into [`RelatedItem`]s

use super::types::{PostDetail, RelatedItem};

/// Placeholder title for items without one
pub const UNTITLED: &str = "Untitled";

/// Placeholder URL for items that cannot be linked
pub const PLACEHOLDER_URL: &str = "#";

/// Author name used when the directory does not know the author
pub const UNKNOWN_AUTHOR: &str = "N/A";

/// Network label used when the hub URL has no host
pub const DEFAULT_NETWORK_NAME: &str = "Chiral Network";

/// Metadata key carrying the item's original URL
pub const SOURCE_URL_META_KEY: &str = "chiral_source_url";

/// Normalize one detail response. Returns `None` when the response has no
/// usable identifier.
pub fn normalize_item(detail: PostDetail, network_name: &str) -> Option<RelatedItem> {
    let id = detail.id.filter(|id| !id.is_blank())?;

    let url = source_url_override(&detail.metadata)
        .or_else(|| non_empty(detail.url))
        .unwrap_or_else(|| PLACEHOLDER_URL.to_string());

    Some(RelatedItem {
        id,
        title: non_empty(detail.title).unwrap_or_else(|| UNTITLED.to_string()),
        url,
        excerpt: detail
            .excerpt
            .map(|html| strip_html_tags(&html))
            .unwrap_or_default(),
        thumbnail_url: non_empty(detail.featured_image),
        published_at: non_empty(detail.date),
        author_name: detail
            .author
            .and_then(|author| non_empty(author.name))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        network_name: network_name.to_string(),
    })
}

/// Host of the hub URL, used as the human-readable network label
pub fn network_name(hub_url: &str) -> String {
    url::Url::parse(hub_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| DEFAULT_NETWORK_NAME.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Explicit source URL from the metadata array, if present and non-empty
fn source_url_override(metadata: &serde_json::Value) -> Option<String> {
    metadata
        .as_array()?
        .iter()
        .find(|meta| meta.get("key").and_then(|k| k.as_str()) == Some(SOURCE_URL_META_KEY))
        .and_then(|meta| meta.get("value"))
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reduce an HTML fragment to its text content
///
/// Tags are dropped, character references decoded and the result trimmed.
pub fn strip_html_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    decode_entities(&text).trim().to_string()
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        // Longest reference we decode is well under 12 bytes
        let decoded = candidate
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .and_then(|(end, _)| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{ItemId, PostAuthor};
    use serde_json::json;

    fn detail(id: i64) -> PostDetail {
        PostDetail {
            id: Some(ItemId::Int(id)),
            title: Some("A title".to_string()),
            url: Some("https://hub.example/chiral_data/a-title/".to_string()),
            excerpt: Some("<p>Short &amp; sweet [&hellip;]</p>\n".to_string()),
            date: Some("2024-05-01T10:00:00+00:00".to_string()),
            featured_image: Some("https://hub.example/img.png".to_string()),
            author: Some(PostAuthor {
                name: Some("Ada".to_string()),
            }),
            metadata: json!([]),
        }
    }

    #[test]
    fn test_normalize_full_item() {
        let item = normalize_item(detail(5), "hub.example").unwrap();

        assert_eq!(item.id, ItemId::Int(5));
        assert_eq!(item.title, "A title");
        assert_eq!(item.url, "https://hub.example/chiral_data/a-title/");
        assert_eq!(item.excerpt, "Short & sweet [\u{2026}]");
        assert_eq!(item.thumbnail_url.as_deref(), Some("https://hub.example/img.png"));
        assert_eq!(item.author_name, "Ada");
        assert_eq!(item.network_name, "hub.example");
        assert!(item.has_author());
    }

    #[test]
    fn test_source_url_metadata_takes_precedence() {
        let mut d = detail(5);
        d.metadata = json!([
            { "id": "1", "key": "other", "value": "x" },
            { "id": "2", "key": "chiral_source_url", "value": "https://site.example/original" }
        ]);

        let item = normalize_item(d, "hub.example").unwrap();
        assert_eq!(item.url, "https://site.example/original");
    }

    #[test]
    fn test_empty_source_url_metadata_is_ignored() {
        let mut d = detail(5);
        d.metadata = json!([{ "key": "chiral_source_url", "value": "" }]);

        let item = normalize_item(d, "hub.example").unwrap();
        assert_eq!(item.url, "https://hub.example/chiral_data/a-title/");
    }

    #[test]
    fn test_placeholders_for_missing_fields() {
        let d = PostDetail {
            id: Some(ItemId::Int(9)),
            featured_image: Some(String::new()),
            metadata: json!(false),
            ..Default::default()
        };

        let item = normalize_item(d, "hub.example").unwrap();
        assert_eq!(item.title, UNTITLED);
        assert_eq!(item.url, PLACEHOLDER_URL);
        assert_eq!(item.excerpt, "");
        assert_eq!(item.thumbnail_url, None);
        assert_eq!(item.published_at, None);
        assert_eq!(item.author_name, UNKNOWN_AUTHOR);
        assert!(!item.has_author());
    }

    #[test]
    fn test_false_author_normalizes_to_unknown() {
        let d: PostDetail = serde_json::from_value(json!({
            "ID": 11,
            "title": false,
            "URL": "https://hub.example/chiral_data/eleven/",
            "featured_image": false,
            "author": false,
            "metadata": false
        }))
        .unwrap();

        let item = normalize_item(d, "hub.example").unwrap();
        assert_eq!(item.id, ItemId::Int(11));
        assert_eq!(item.author_name, "N/A");
        assert_eq!(item.title, UNTITLED);
        assert_eq!(item.thumbnail_url, None);
        assert_eq!(item.url, "https://hub.example/chiral_data/eleven/");
    }

    #[test]
    fn test_blank_id_is_rejected() {
        let mut d = detail(0);
        assert!(normalize_item(d.clone(), "hub.example").is_none());

        d.id = None;
        assert!(normalize_item(d, "hub.example").is_none());
    }

    #[test]
    fn test_network_name() {
        assert_eq!(network_name("https://hub.example"), "hub.example");
        assert_eq!(network_name("https://hub.example:8443/path"), "hub.example");
        assert_eq!(network_name("not a url"), DEFAULT_NETWORK_NAME);
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(strip_html_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html_tags("  plain  "), "plain");
        assert_eq!(strip_html_tags("a &lt;b&gt; &#8217; &#x41;"), "a <b> \u{2019} A");
        assert_eq!(strip_html_tags("Fish & chips &unknown;"), "Fish & chips &unknown;");
        assert_eq!(strip_html_tags(""), "");
    }
}
