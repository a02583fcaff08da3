// src/normalize/email.rs

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Free / generic mail providers. A shared domain here says nothing about the
/// company, so these never produce a comparison key.
static GENERIC_EMAIL_PROVIDERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "gmail.com",
        "googlemail.com",
        "outlook.com",
        "hotmail.com",
        "hotmail.co.uk",
        "live.com",
        "msn.com",
        "yahoo.com",
        "yahoo.co.uk",
        "yahoo.com.au",
        "ymail.com",
        "aol.com",
        "icloud.com",
        "me.com",
        "mac.com",
        "protonmail.com",
        "proton.me",
        "mail.com",
        "gmx.com",
        "gmx.de",
        "yandex.com",
        "zoho.com",
        "bigpond.com",
        "bigpond.net.au",
        "optusnet.com.au",
    ]
    .into_iter()
    .collect()
});

/// Extracts the domain of an email address, or None when the address is
/// malformed or belongs to a generic provider.
pub fn extract_email_domain(email: &str) -> Option<String> {
    let trimmed = email.trim().to_lowercase();
    let (local, domain) = trimmed.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    if GENERIC_EMAIL_PROVIDERS.contains(domain) {
        return None;
    }
    Some(domain.to_string())
}
