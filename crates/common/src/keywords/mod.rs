//! Keyword normalization
//!
//! Enquiry keywords are matched with Postgres array overlap, which compares
//! elements exactly. Everything written to or searched against
//! `userenquiries.keywords` goes through [`normalize_keywords`] first.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Longest keyword kept, in characters
pub const MAX_KEYWORD_CHARS: usize = 100;

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Normalize a single keyword. Returns `None` if nothing is left.
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let collapsed = whitespace().replace_all(raw.trim(), " ").to_lowercase();
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_KEYWORD_CHARS).collect())
}

/// Normalize a keyword set: lowercase, trim, collapse whitespace, and drop
/// empty entries and duplicates. First-seen order is kept.
pub fn normalize_keywords<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|k| normalize_keyword(k.as_ref()))
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keywords() {
        let keywords = normalize_keywords([
            "  Income Tax ",
            "income   tax",
            "VAT",
            "",
            "   ",
            "vat",
            "Consumer\tCredit",
        ]);
        assert_eq!(keywords, vec!["income tax", "vat", "consumer credit"]);
    }

    #[test]
    fn test_keyword_is_truncated() {
        let long = "a".repeat(MAX_KEYWORD_CHARS + 20);
        let keyword = normalize_keyword(&long).unwrap();
        assert_eq!(keyword.chars().count(), MAX_KEYWORD_CHARS);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let long = "£".repeat(MAX_KEYWORD_CHARS + 1);
        let keyword = normalize_keyword(&long).unwrap();
        assert_eq!(keyword, "£".repeat(MAX_KEYWORD_CHARS));

        // Keywords that only differ past the cut collapse into one
        let a = format!("{}a", "x".repeat(MAX_KEYWORD_CHARS));
        let b = format!("{}b", "x".repeat(MAX_KEYWORD_CHARS));
        assert_eq!(normalize_keywords([a, b]).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_keywords(Vec::<String>::new()).is_empty());
        assert_eq!(normalize_keyword(" \n "), None);
    }
}
