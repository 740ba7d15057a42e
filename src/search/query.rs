//! Query sanitation / 查询串清洗
//!
//! Raw user input reaches the FTS engine as a MATCH expression, so everything
//! except word characters, digits and whitespace is stripped first. The same
//! sanitized string feeds the fuzzy tier.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches every character that is not a word character or whitespace.
/// `\w` is Unicode-aware here, so accented Latin, Cyrillic and CJK text
/// survives sanitation untouched.
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Strip FTS query syntax from a raw query string.
///
/// Idempotent: sanitizing an already-sanitized string returns it unchanged.
pub fn sanitize_query(raw: &str) -> String {
    NON_WORD.replace_all(raw, "").into_owned()
}

/// Split a sanitized query into lowercased search terms.
///
/// An empty or whitespace-only query yields an empty term list; callers must
/// treat that as "no results", never "match everything".
pub fn query_terms(sanitized: &str) -> Vec<String> {
    sanitized
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_query("caf\u{e9}!!"), "caf\u{e9}");
        assert_eq!(sanitize_query("hello, world."), "hello world");
        assert_eq!(sanitize_query("a-b_c"), "ab_c");
        assert_eq!(sanitize_query("\"quoted\" OR (x)"), "quoted OR x");
    }

    #[test]
    fn test_sanitize_preserves_non_latin() {
        assert_eq!(sanitize_query("привет, мир!"), "привет мир");
        assert_eq!(sanitize_query("汉语词汇?"), "汉语词汇");
        assert_eq!(sanitize_query("caf\u{e9} au lait"), "caf\u{e9} au lait");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["caf\u{e9}!!", "a*b:c", "привет, мир!", "", "   "] {
            let once = sanitize_query(raw);
            assert_eq!(sanitize_query(&once), once);
        }
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("Hello  World"), vec!["hello", "world"]);
        assert_eq!(query_terms("ПРИВЕТ"), vec!["привет"]);
        assert!(query_terms("").is_empty());
        assert!(query_terms("   ").is_empty());
    }
}
