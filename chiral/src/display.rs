//! HTML rendering of related-content results

use crate::i18n::{interpolate, Translator};
use chiral_core::config::DisplayConfig;
use chiral_core::gateway::normalize::{DEFAULT_NETWORK_NAME, PLACEHOLDER_URL};
use chiral_core::{ChiralError, RelatedItem};
use std::fmt::Write;
use std::sync::Arc;

const LIST_CLASS: &str = "chiral-connector-related-posts-list";
const EMPTY_CLASS: &str = "chiral-no-related-posts";
const LINK_ATTRS: &str = r#"target="_blank" rel="noopener noreferrer""#;

/// What a related-content block currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Loading,
    Items(Vec<RelatedItem>),
    /// Lookup succeeded with nothing related
    NoData,
    /// The page has no record in the network
    NotLinked,
    Error(String),
}

impl RenderState {
    /// Map a lookup outcome onto a state; empty lists render as `NoData`
    pub fn from_result(result: chiral_core::Result<Vec<RelatedItem>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => RenderState::NoData,
            Ok(items) => RenderState::Items(items),
            Err(ChiralError::NotLinked) => RenderState::NotLinked,
            Err(ChiralError::Fetch(e)) => RenderState::Error(e.to_string()),
            Err(e) => RenderState::Error(e.to_string()),
        }
    }
}

/// Produces HTML fragments for each [`RenderState`]
#[derive(Clone)]
pub struct Renderer {
    translator: Arc<dyn Translator>,
    hub_url: String,
    show_thumbnails: bool,
    show_excerpts: bool,
}

impl Renderer {
    pub fn new(translator: Arc<dyn Translator>, hub_url: impl Into<String>, display: &DisplayConfig) -> Self {
        Self {
            translator,
            hub_url: hub_url.into(),
            show_thumbnails: display.show_thumbnails,
            show_excerpts: display.show_excerpts,
        }
    }

    pub fn render(&self, state: &RenderState) -> String {
        match state {
            RenderState::Loading => format!(
                r#"<p class="chiral-loading">{}</p>"#,
                self.message_html("loading", &[])
            ),
            RenderState::Items(items) if items.is_empty() => self.render_notice("noData"),
            RenderState::Items(items) => self.render_items(items),
            RenderState::NoData => self.render_notice("noData"),
            RenderState::NotLinked => self.render_notice("cptNotFound"),
            RenderState::Error(message) => {
                let text = format!("{}: {}", self.translator.translate("fetchError", &[]), message);
                format!(
                    r#"<div class="{}"><h3>{}</h3><p class="{}">{}</p></div>"#,
                    LIST_CLASS,
                    self.message_html("relatedTitle", &[]),
                    EMPTY_CLASS,
                    escape_html(&text)
                )
            }
        }
    }

    fn render_notice(&self, key: &str) -> String {
        format!(
            r#"<div class="{}"><h3>{}</h3>{}<p class="{}">{}</p></div>"#,
            LIST_CLASS,
            self.message_html("relatedTitle", &[]),
            self.subtitle_html(None),
            EMPTY_CLASS,
            self.message_html(key, &[])
        )
    }

    fn render_items(&self, items: &[RelatedItem]) -> String {
        let mut html = format!(
            r#"<div class="{}"><h3>{}</h3>{}<ul>"#,
            LIST_CLASS,
            self.message_html("relatedTitle", &[]),
            self.subtitle_html(items.first())
        );
        for item in items {
            html.push_str(&self.render_item(item));
        }
        html.push_str("</ul></div>");
        html
    }

    fn render_item(&self, item: &RelatedItem) -> String {
        let href = if item.url.is_empty() {
            PLACEHOLDER_URL
        } else {
            item.url.as_str()
        };
        let href = escape_html(href);
        let title = escape_html(&item.title);

        let mut html = String::from("<li>");

        if let Some(thumbnail) = item.thumbnail_url.as_deref().filter(|_| self.show_thumbnails) {
            let _ = write!(
                html,
                r#"<div class="related-post-thumbnail"><a href="{}" {}><img src="{}" alt="{}"></a></div>"#,
                href,
                LINK_ATTRS,
                escape_html(thumbnail),
                title
            );
        }

        let _ = write!(
            html,
            r#"<div class="related-post-content"><h4><a href="{}" {}>{}</a></h4>"#,
            href, LINK_ATTRS, title
        );

        if self.show_excerpts && !item.excerpt.is_empty() {
            let _ = write!(
                html,
                r#"<div class="related-post-excerpt">{}</div>"#,
                escape_html(&item.excerpt)
            );
        }

        if let Some(label) = self.source_label(item) {
            let _ = write!(
                html,
                r#"<small class="related-post-source">{}</small>"#,
                self.message_html("source", &[escape_html(&label).as_str()])
            );
        }

        html.push_str("</div></li>");
        html
    }

    /// Plain-text source attribution for `item`
    ///
    /// Author name first; then the hub host for items hosted on the hub;
    /// then the host of the item URL.
    pub fn source_label(&self, item: &RelatedItem) -> Option<String> {
        if item.has_author() {
            return Some(item.author_name.clone());
        }

        let on_hub = !self.hub_url.is_empty()
            && item.url.starts_with(&self.hub_url)
            && item.url.contains("/chiral_data/");
        if on_hub {
            return Some(match host_of(&self.hub_url) {
                Some(host) => format!("{} (Hub)", host),
                None => "Chiral Hub".to_string(),
            });
        }

        if item.url.is_empty() || item.url == PLACEHOLDER_URL {
            return None;
        }
        host_of(&item.url)
    }

    fn subtitle_html(&self, first: Option<&RelatedItem>) -> String {
        let network_name = first
            .map(|item| item.network_name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| host_of(&self.hub_url))
            .unwrap_or_else(|| DEFAULT_NETWORK_NAME.to_string());

        let network = if self.hub_url.trim().is_empty() {
            escape_html(&network_name)
        } else {
            format!(
                r#"<a href="{}" {}>{}</a>"#,
                escape_html(&self.hub_url),
                LINK_ATTRS,
                escape_html(&network_name)
            )
        };

        format!(
            r#"<small class="chiral-hub-name-subtitle">{}</small>"#,
            self.message_html("fromChiralNetwork", &[network.as_str()])
        )
    }

    /// Escaped message for `key` with pre-rendered HTML parameters
    fn message_html(&self, key: &str, params_html: &[&str]) -> String {
        let placeholders: Vec<String> = (0..params_html.len()).map(|i| format!("{{{}}}", i)).collect();
        let placeholders: Vec<&str> = placeholders.iter().map(String::as_str).collect();

        let template = self.translator.translate(key, &placeholders);
        interpolate(&escape_html(&template), params_html)
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
