// src/normalize/name.rs

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Legal-entity suffixes stripped from the end of a company name. Stripping
/// repeats while the trailing token is in this set, so "Pty Ltd" collapses
/// in two steps.
static LEGAL_SUFFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ltd", "limited", "inc", "incorporated", "llc", "llp", "lp", "plc", "corp",
        "corporation", "co", "company", "gmbh", "ag", "pty", "bv", "nv", "sa", "sarl",
        "srl", "spa", "oy", "ab", "as", "aps", "kft", "sro", "pte", "pvt", "kk",
    ]
    .into_iter()
    .collect()
});

/// Canonicalizes a company name for comparison: lower-case, strip
/// punctuation (spaces preserved), collapse whitespace, drop "and"/"&",
/// then strip legal-entity suffixes anchored at the end.
pub fn normalize_company_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut tokens: Vec<&str> = stripped
        .split_whitespace()
        .filter(|t| *t != "and")
        .collect();

    while let Some(last) = tokens.last() {
        if LEGAL_SUFFIXES.contains(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("Acme Pty Ltd"), "acme");
        assert_eq!(normalize_company_name("ACME LIMITED"), "acme");
        assert_eq!(normalize_company_name("Smith & Jones, Inc."), "smith jones");
        assert_eq!(normalize_company_name("Baker and Sons Co"), "baker sons");
        assert_eq!(
            normalize_company_name("Müller GmbH"),
            "müller"
        );
    }

    #[test]
    fn test_normalize_company_name_empty() {
        assert_eq!(normalize_company_name(""), "");
        assert_eq!(normalize_company_name("   "), "");
        // A name that is nothing but suffixes collapses to empty.
        assert_eq!(normalize_company_name("Pty Ltd"), "");
    }

    #[test]
    fn test_normalize_company_name_suffix_only_at_end() {
        // "co" inside the name must survive; only the trailing run is stripped.
        assert_eq!(normalize_company_name("Co Op Bakery Ltd"), "co op bakery");
    }

    #[test]
    fn test_normalize_company_name_idempotent() {
        for input in ["Acme Pty Ltd", "Smith & Jones, Inc.", "The Book Shop"] {
            let once = normalize_company_name(input);
            assert_eq!(normalize_company_name(&once), once, "input: {}", input);
        }
    }
}
