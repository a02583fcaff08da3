// src/normalize/website.rs

use url::Url;

/// Reduces a website value to a bare registrable domain: lower-cased, scheme
/// and leading "www." stripped, path/query/trailing slash discarded.
/// Unusable values (empty, mailto:/tel:, IP literals) normalize to empty.
pub fn normalize_website(url_s: &str) -> String {
    let trimmed = url_s.trim();
    if trimmed.is_empty() || trimmed.starts_with("mailto:") || trimmed.starts_with("tel:") {
        return String::new();
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&with_scheme)
        .ok()
        .and_then(|parsed| {
            parsed.host_str().and_then(|host| {
                let domain = host.to_lowercase();
                let domain = domain.strip_prefix("www.").unwrap_or(&domain);
                if domain.is_empty() || !domain.contains('.') || is_ip_address(domain) {
                    None
                } else {
                    Some(domain.to_string())
                }
            })
        })
        .unwrap_or_default()
}

pub fn is_ip_address(domain_candidate: &str) -> bool {
    if domain_candidate.split('.').count() == 4
        && domain_candidate
            .split('.')
            .all(|part| part.parse::<u8>().is_ok())
    {
        return true;
    }
    if domain_candidate.contains(':') {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_website() {
        assert_eq!(normalize_website("https://www.acme.com.au/"), "acme.com.au");
        assert_eq!(normalize_website("http://acme.com.au/about?x=1"), "acme.com.au");
        assert_eq!(normalize_website("www.acme.com.au"), "acme.com.au");
        assert_eq!(normalize_website("ACME.COM.AU"), "acme.com.au");
    }

    #[test]
    fn test_normalize_website_unusable_values() {
        assert_eq!(normalize_website(""), "");
        assert_eq!(normalize_website("mailto:info@acme.com"), "");
        assert_eq!(normalize_website("tel:+6129990000"), "");
        assert_eq!(normalize_website("192.168.0.1"), "");
        assert_eq!(normalize_website("localhost"), "");
    }

    #[test]
    fn test_normalize_website_idempotent() {
        for input in ["https://www.acme.com.au/contact", "acme.com.au"] {
            let once = normalize_website(input);
            assert_eq!(normalize_website(&once), once, "input: {}", input);
        }
    }
}
