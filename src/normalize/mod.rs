// src/normalize/mod.rs
//
// Pure, deterministic field canonicalization. Every function here is a
// fixed-point transform: normalize(normalize(x)) == normalize(x).

pub mod address;
pub mod email;
pub mod name;
pub mod phone;
pub mod website;

pub use address::normalize_address;
pub use email::extract_email_domain;
pub use name::normalize_company_name;
pub use phone::normalize_phone;
pub use website::normalize_website;

use crate::models::core::{Account, NormalizedAccount};

/// Lower-case, strip punctuation, collapse whitespace. Used for fields like
/// billing city that need no dictionary treatment.
pub fn normalize_simple(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives all comparison keys for one account. Website comes from the
/// explicit website field; the email-domain fallback is applied by
/// [`NormalizedAccount::domain_key`] so scoring can still distinguish the two.
pub fn normalize_account(account: &Account, country: Option<&str>) -> NormalizedAccount {
    NormalizedAccount {
        name: normalize_company_name(account.name.as_deref().unwrap_or("")),
        phone: normalize_phone(account.phone.as_deref().unwrap_or(""), country),
        website: normalize_website(account.website.as_deref().unwrap_or("")),
        email_domain: account
            .email
            .as_deref()
            .and_then(extract_email_domain),
        billing_street: normalize_address(account.billing_street.as_deref().unwrap_or("")),
        billing_city: normalize_simple(account.billing_city.as_deref().unwrap_or("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_simple() {
        assert_eq!(normalize_simple("  Sydney,  NSW. "), "sydney nsw");
        assert_eq!(normalize_simple(""), "");
    }

    #[test]
    fn test_normalize_simple_idempotent() {
        let once = normalize_simple("St. Kilda East!");
        assert_eq!(normalize_simple(&once), once);
    }

    #[test]
    fn test_normalize_account_email_fallback() {
        let account = Account {
            name: Some("Acme Pty Ltd".to_string()),
            email: Some("sales@acme.com.au".to_string()),
            ..Default::default()
        };
        let normalized = normalize_account(&account, Some("Australia"));
        assert_eq!(normalized.name, "acme");
        assert_eq!(normalized.website, "");
        assert_eq!(normalized.domain_key(), "acme.com.au");
    }

    #[test]
    fn test_normalize_account_generic_email_gives_no_domain() {
        let account = Account {
            name: Some("Acme".to_string()),
            email: Some("acme@gmail.com".to_string()),
            ..Default::default()
        };
        let normalized = normalize_account(&account, None);
        assert_eq!(normalized.email_domain, None);
        assert_eq!(normalized.domain_key(), "");
    }
}
