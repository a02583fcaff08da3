// src/normalize/address.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Street-type abbreviations expanded token-by-token. Expanded forms are not
/// keys, which keeps the transform idempotent.
static STREET_ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("st", "street"),
        ("str", "street"),
        ("rd", "road"),
        ("ave", "avenue"),
        ("av", "avenue"),
        ("blvd", "boulevard"),
        ("dr", "drive"),
        ("ln", "lane"),
        ("ct", "court"),
        ("pl", "place"),
        ("sq", "square"),
        ("pkwy", "parkway"),
        ("cir", "circle"),
        ("hwy", "highway"),
        ("tce", "terrace"),
        ("cres", "crescent"),
    ]
    .into_iter()
    .collect()
});

/// Unit designators and their values contribute nothing to building-level
/// comparison and are removed.
static UNIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:apt|apartment|suite|ste|unit|bldg|building|fl|floor|room|rm)\s+\w+\b")
        .unwrap()
});

/// Canonicalizes a street address: lower-case, strip punctuation, drop unit
/// designators, expand street-type abbreviations, collapse whitespace.
pub fn normalize_address(address: &str) -> String {
    let lowered = address.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let without_units = UNIT_PATTERN.replace_all(&stripped, " ");

    without_units
        .split_whitespace()
        .map(|token| *STREET_ABBREVIATIONS.get(token).unwrap_or(&token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address_expands_abbreviations() {
        assert_eq!(normalize_address("123 Main St"), "123 main street");
        assert_eq!(normalize_address("45 George Rd."), "45 george road");
        assert_eq!(
            normalize_address("1 Macquarie Pl, Sydney"),
            "1 macquarie place sydney"
        );
    }

    #[test]
    fn test_normalize_address_removes_units() {
        assert_eq!(
            normalize_address("Suite 4, 123 Main Street"),
            "123 main street"
        );
        assert_eq!(normalize_address("123 Main St Unit 7B"), "123 main street");
    }

    #[test]
    fn test_normalize_address_empty() {
        assert_eq!(normalize_address(""), "");
        assert_eq!(normalize_address("  ,  "), "");
    }

    #[test]
    fn test_normalize_address_idempotent() {
        for input in ["Suite 4, 123 Main St", "45 George Rd", "1 Short Lane"] {
            let once = normalize_address(input);
            assert_eq!(normalize_address(&once), once, "input: {}", input);
        }
    }
}
