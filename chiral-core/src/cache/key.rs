//! Cache key derivation for related-content lookups
//!
//! Keys come from a 32-bit rolling string hash. It is not collision-free:
//! two different lookups may share a key, which at worst serves a wrong
//! cached list until the entry expires.

use crate::cache::types::CacheKey;

/// Prefix shared by every related-content key
pub const RELATED_POSTS_PREFIX: &str = "related_posts_";

/// Derive the cache key for a `(page, hub, count)` lookup
pub fn related_posts_key(page_url: &str, hub_url: &str, count: usize) -> CacheKey {
    let input = format!("{}|{}|{}", page_url, hub_url, count);
    format!("{}{}", RELATED_POSTS_PREFIX, simple_hash(&input))
}

/// 32-bit rolling hash (`h = h * 31 + unit`) over UTF-16 code units,
/// rendered as the base-36 absolute value
pub fn simple_hash(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });

    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
