//! Localized UI messages
//!
//! Built-in packs cover English, Simplified Chinese, Traditional Chinese and
//! Japanese. Lookups fall back to the fallback locale, then to the key.

use chiral_core::config::{known_locale, normalize_locale, I18nConfig};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Message lookup used by the renderer
pub trait Translator: Send + Sync {
    /// Message for `key` with `{0}`, `{1}`, ... replaced by `params`
    fn translate(&self, key: &str, params: &[&str]) -> String;

    /// Active locale
    fn locale(&self) -> &str;
}

type MessagePack = HashMap<String, String>;

const EN: &[(&str, &str)] = &[
    ("loading", "Loading related Chiral data..."),
    ("relatedTitle", "Related Content"),
    ("noData", "No related Chiral data found at the moment."),
    ("fetchError", "Error fetching related data"),
    ("configError", "Chiral Connector: Configuration error for related posts."),
    ("source", "Source: {0}"),
    ("fromChiralNetwork", "From Chiral Network: {0}"),
    ("cptNotFound", "Page data not found in Chiral network"),
    ("networkError", "Network connection error"),
];

const ZH_CN: &[(&str, &str)] = &[
    ("loading", "正在加载相关 Chiral 数据..."),
    ("relatedTitle", "相关内容"),
    ("noData", "暂时没有找到相关 Chiral 数据。"),
    ("fetchError", "获取相关数据时出错"),
    ("configError", "Chiral Connector：相关文章配置错误。"),
    ("source", "来源：{0}"),
    ("fromChiralNetwork", "来自 Chiral 网络：{0}"),
    ("cptNotFound", "在 Chiral 网络中未找到页面数据"),
    ("networkError", "网络连接错误"),
];

const ZH_TW: &[(&str, &str)] = &[
    ("loading", "正在載入相關 Chiral 資料..."),
    ("relatedTitle", "相關內容"),
    ("noData", "暫時沒有找到相關 Chiral 資料。"),
    ("fetchError", "獲取相關資料時出錯"),
    ("configError", "Chiral Connector：相關文章配置錯誤。"),
    ("source", "來源：{0}"),
    ("fromChiralNetwork", "來自 Chiral 網路：{0}"),
    ("cptNotFound", "在 Chiral 網路中未找到頁面資料"),
    ("networkError", "網路連線錯誤"),
];

const JA: &[(&str, &str)] = &[
    ("loading", "関連 Chiral データを読み込み中..."),
    ("relatedTitle", "関連コンテンツ"),
    ("noData", "関連 Chiral データが見つかりませんでした。"),
    ("fetchError", "関連データの取得エラー"),
    ("configError", "Chiral Connector：関連記事の設定エラー。"),
    ("source", "ソース：{0}"),
    ("fromChiralNetwork", "Chiral ネットワークから：{0}"),
    ("cptNotFound", "Chiral ネットワークにページデータが見つかりません"),
    ("networkError", "ネットワーク接続エラー"),
];

fn builtin_packs() -> BTreeMap<String, MessagePack> {
    [("en", EN), ("zh-CN", ZH_CN), ("zh-TW", ZH_TW), ("ja", JA)]
        .into_iter()
        .map(|(locale, pack)| {
            let messages = pack
                .iter()
                .map(|(key, text)| (key.to_string(), text.to_string()))
                .collect();
            (locale.to_string(), messages)
        })
        .collect()
}

/// Translator over the built-in packs plus custom overrides
#[derive(Debug, Clone)]
pub struct I18n {
    locale: String,
    fallback_locale: String,
    messages: BTreeMap<String, MessagePack>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("en")
    }
}

impl I18n {
    pub fn new(locale: &str) -> Self {
        let mut i18n = Self {
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            messages: builtin_packs(),
        };
        i18n.set_locale(locale);
        i18n
    }

    pub fn from_config(config: &I18nConfig) -> Self {
        let mut i18n = Self {
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            messages: builtin_packs(),
        };
        i18n.merge_messages(&config.custom_messages);
        i18n.locale = i18n.resolve_locale(&config.locale);
        i18n.fallback_locale = i18n.resolve_locale(&config.fallback_locale);
        i18n
    }

    /// Merge `custom` over the current packs; unknown locales become new packs
    pub fn merge_messages(&mut self, custom: &HashMap<String, MessagePack>) {
        for (locale, messages) in custom {
            self.messages
                .entry(locale.clone())
                .or_default()
                .extend(messages.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    /// Switch locale; tags are normalized unless a pack exists under the exact tag
    pub fn set_locale(&mut self, locale: &str) {
        self.locale = self.resolve_locale(locale);
    }

    pub fn fallback_locale(&self) -> &str {
        &self.fallback_locale
    }

    /// Every locale with a message pack, sorted
    pub fn available_locales(&self) -> Vec<String> {
        self.messages.keys().cloned().collect()
    }

    /// Whether `locale` has a pack, directly or through a recognised alias
    pub fn is_locale_supported(&self, locale: &str) -> bool {
        self.messages.contains_key(locale)
            || known_locale(locale).is_some_and(|tag| self.messages.contains_key(tag))
    }

    fn resolve_locale(&self, locale: &str) -> String {
        if self.messages.contains_key(locale) {
            locale.to_string()
        } else {
            normalize_locale(locale)
        }
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.messages
            .get(locale)
            .and_then(|pack| pack.get(key))
            .map(String::as_str)
    }

    /// Shorthand for [`Translator::translate`]
    pub fn t(&self, key: &str, params: &[&str]) -> String {
        self.translate(key, params)
    }
}

impl Translator for I18n {
    fn translate(&self, key: &str, params: &[&str]) -> String {
        let message = self
            .lookup(&self.locale, key)
            .or_else(|| self.lookup(&self.fallback_locale, key));

        match message {
            Some(message) => interpolate(message, params),
            None => {
                warn!("Translation key \"{}\" not found for locale \"{}\"", key, self.locale);
                key.to_string()
            }
        }
    }

    fn locale(&self) -> &str {
        &self.locale
    }
}

/// Replace `{N}` placeholders with `params[N]`; out-of-range placeholders stay
pub fn interpolate(template: &str, params: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];

        let replacement = candidate.find('}').and_then(|close| {
            let index = &candidate[1..close];
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let param = index.parse::<usize>().ok().and_then(|i| params.get(i))?;
            Some((*param, close))
        });

        match replacement {
            Some((param, close)) => {
                out.push_str(param);
                rest = &candidate[close + 1..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_locales() {
        let i18n = I18n::default();
        assert_eq!(i18n.available_locales(), vec!["en", "ja", "zh-CN", "zh-TW"]);
        assert_eq!(i18n.t("relatedTitle", &[]), "Related Content");
    }

    #[test]
    fn test_locale_normalization() {
        assert_eq!(I18n::new("zh").locale(), "zh-CN");
        assert_eq!(I18n::new("zh-HK").locale(), "zh-TW");
        assert_eq!(I18n::new("ja-JP").locale(), "ja");
        assert_eq!(I18n::new("fr").locale(), "en");
        assert_eq!(I18n::new("zh-TW").t("relatedTitle", &[]), "相關內容");
    }

    #[test]
    fn test_interpolation() {
        let i18n = I18n::new("ja");
        assert_eq!(i18n.t("source", &["Ada"]), "ソース：Ada");
        assert_eq!(interpolate("{0} and {1}", &["a"]), "a and {1}");
        assert_eq!(interpolate("{x} {} {0", &["a"]), "{x} {} {0");
        assert_eq!(interpolate("{1}{0}", &["a", "b"]), "ba");
    }

    #[test]
    fn test_missing_key_falls_back() {
        let mut custom = HashMap::new();
        custom.insert(
            "ja".to_string(),
            HashMap::from([("onlyJa".to_string(), "日本語".to_string())]),
        );
        custom.insert(
            "en".to_string(),
            HashMap::from([("onlyEn".to_string(), "English only".to_string())]),
        );

        let config = I18nConfig {
            locale: "ja".to_string(),
            fallback_locale: "en".to_string(),
            custom_messages: custom,
        };
        let i18n = I18n::from_config(&config);

        assert_eq!(i18n.t("onlyJa", &[]), "日本語");
        assert_eq!(i18n.t("onlyEn", &[]), "English only");
        assert_eq!(i18n.t("doesNotExist", &[]), "doesNotExist");
    }

    #[test]
    fn test_custom_messages_override_and_add_locales() {
        let custom = HashMap::from([
            (
                "en".to_string(),
                HashMap::from([("relatedTitle".to_string(), "You may also like".to_string())]),
            ),
            (
                "fr".to_string(),
                HashMap::from([("relatedTitle".to_string(), "Contenu associé".to_string())]),
            ),
        ]);

        let mut i18n = I18n::default();
        i18n.merge_messages(&custom);

        assert_eq!(i18n.t("relatedTitle", &[]), "You may also like");
        assert_eq!(i18n.t("noData", &[]), "No related Chiral data found at the moment.");
        assert!(i18n.is_locale_supported("fr"));

        i18n.set_locale("fr");
        assert_eq!(i18n.locale(), "fr");
        assert_eq!(i18n.t("relatedTitle", &[]), "Contenu associé");
        assert_eq!(i18n.t("loading", &[]), "Loading related Chiral data...");
    }

    #[test]
    fn test_is_locale_supported() {
        let i18n = I18n::default();
        assert!(i18n.is_locale_supported("en"));
        assert!(i18n.is_locale_supported("en-GB"));
        assert!(i18n.is_locale_supported("zh-cn"));
        assert!(i18n.is_locale_supported("ja"));
        assert!(!i18n.is_locale_supported("de"));
    }
}
