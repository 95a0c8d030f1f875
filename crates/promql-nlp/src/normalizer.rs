//! Text normalization.
//!
//! Canonicalizes free text before classification and extraction so the
//! downstream regexes only have to cope with one spelling of each idea.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

/// Fixed phrase substitutions, applied in this order to whole words only.
const PHRASES: &[(&str, &str)] = &[
    ("last hour", "1h"),
    ("past hour", "1h"),
    ("last day", "24h"),
    ("past day", "24h"),
    ("last week", "7d"),
    ("past week", "7d"),
    ("greater than", ">"),
    ("less than", "<"),
    ("equal to", "="),
];

lazy_static! {
    static ref PHRASE_PATTERNS: Vec<(Regex, &'static str)> = PHRASES
        .iter()
        .map(|(phrase, replacement)| {
            let pattern = format!(r"\b{}\b", regex::escape(phrase));
            (Regex::new(&pattern).unwrap(), *replacement)
        })
        .collect();
    static ref VERBOSE_DURATION: Regex = Regex::new(
        r"\b(\d+)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\b"
    )
    .unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Canonicalizes natural-language queries.
#[derive(Debug, Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Lowercase, substitute fixed phrases, fold verbose durations
    /// (`5 minutes` → `5m`), and collapse whitespace. Never fails.
    pub fn normalize(&self, query: &str) -> String {
        let mut normalized = query.to_lowercase();

        for (pattern, replacement) in PHRASE_PATTERNS.iter() {
            if pattern.is_match(&normalized) {
                normalized = pattern.replace_all(&normalized, *replacement).into_owned();
            }
        }

        let folded = VERBOSE_DURATION.replace_all(&normalized, |caps: &Captures| {
            format!("{}{}", &caps[1], unit_suffix(&caps[2]))
        });

        let collapsed = WHITESPACE.replace_all(&folded, " ");
        let result = collapsed.trim().to_string();

        trace!(input = query, output = %result, "normalized query");
        result
    }
}

fn unit_suffix(unit: &str) -> &'static str {
    match unit.as_bytes().first() {
        Some(b's') => "s",
        Some(b'm') => "m",
        Some(b'h') => "h",
        Some(b'd') => "d",
        Some(b'w') => "w",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_relative_phrases() {
        let normalizer = Normalizer::new();
        let out = normalizer.normalize("last hour error rate");
        assert!(out.contains("1h"));
        assert!(!out.contains("last hour"));
    }

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        let normalizer = Normalizer::new();
        assert_eq!(
            normalizer.normalize("  Show   ME\tCPU   usage  "),
            "show me cpu usage"
        );
    }

    #[test]
    fn test_folds_verbose_durations() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.normalize("over 5 minutes"), "over 5m");
        assert_eq!(normalizer.normalize("for 2 Hours"), "for 2h");
        assert_eq!(normalizer.normalize("in the last 30 seconds"), "in the last 30s");
        assert_eq!(normalizer.normalize("past 3 days"), "past 3d");
        assert_eq!(normalizer.normalize("10 mins ago"), "10m ago");
    }

    #[test]
    fn test_comparison_phrases() {
        let normalizer = Normalizer::new();
        assert_eq!(
            normalizer.normalize("latency greater than 2 seconds"),
            "latency > 2s"
        );
    }

    #[test]
    fn test_week_phrase() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.normalize("Errors over the past week"), "errors over the 7d");
    }

    #[test]
    fn test_phrases_match_whole_words_only() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.normalize("in the past hours"), "in the past hours");
        assert_eq!(normalizer.normalize("errors last weekend"), "errors last weekend");
        assert_eq!(normalizer.normalize("outlast day one"), "outlast day one");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Normalizer::new().normalize("   "), "");
    }
}
