// src/normalize/phone.rs

use once_cell::sync::Lazy;

/// How a country's numbers are dialled: the international prefix, the local
/// trunk prefix, and how many trailing digits are significant for equality.
#[derive(Debug, Clone, Copy)]
pub struct CountryPhoneRule {
    pub international_prefix: &'static str,
    pub local_prefix: &'static str,
    pub significant_digits: usize,
}

const DEFAULT_RULE: CountryPhoneRule = CountryPhoneRule {
    international_prefix: "",
    local_prefix: "0",
    significant_digits: 9,
};

static COUNTRY_PHONE_RULES: Lazy<Vec<(&'static str, CountryPhoneRule)>> = Lazy::new(|| {
    vec![
        ("australia", rule("61", "0", 9)),
        ("new zealand", rule("64", "0", 8)),
        ("united kingdom", rule("44", "0", 10)),
        ("uk", rule("44", "0", 10)),
        ("united states", rule("1", "", 10)),
        ("usa", rule("1", "", 10)),
        ("canada", rule("1", "", 10)),
        ("ireland", rule("353", "0", 9)),
        ("germany", rule("49", "0", 10)),
        ("france", rule("33", "0", 9)),
        ("netherlands", rule("31", "0", 9)),
        ("singapore", rule("65", "", 8)),
        ("india", rule("91", "0", 10)),
        ("south africa", rule("27", "0", 9)),
        ("japan", rule("81", "0", 9)),
    ]
});

const fn rule(
    international_prefix: &'static str,
    local_prefix: &'static str,
    significant_digits: usize,
) -> CountryPhoneRule {
    CountryPhoneRule {
        international_prefix,
        local_prefix,
        significant_digits,
    }
}

/// Resolves the dialling rule for a country: exact name match first, then a
/// substring match in either direction, then the default rule.
pub fn country_rule(country: Option<&str>) -> CountryPhoneRule {
    let needle = match country {
        Some(c) => c.trim().to_lowercase(),
        None => return DEFAULT_RULE,
    };
    if needle.is_empty() {
        return DEFAULT_RULE;
    }
    if let Some((_, r)) = COUNTRY_PHONE_RULES.iter().find(|(k, _)| *k == needle) {
        return *r;
    }
    if let Some((_, r)) = COUNTRY_PHONE_RULES
        .iter()
        .find(|(k, _)| needle.contains(k) || k.contains(needle.as_str()))
    {
        return *r;
    }
    DEFAULT_RULE
}

/// Reduces a phone number to its country-aware significant-digit suffix.
/// Numbers with fewer than 5 digits are too unreliable to compare and
/// normalize to empty.
///
/// The country calling code is stripped only when the raw input carries a
/// dialling marker (a leading `+`, or `00` followed by the calling code).
/// A marker-free number already at or under the significant length passes
/// through untouched, which makes every output a fixed point of the
/// transform.
pub fn normalize_phone(phone: &str, country: Option<&str>) -> String {
    let trimmed = phone.trim();
    let explicit_intl = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 5 {
        return String::new();
    }

    let rule = country_rule(country);
    let mut rest = digits.as_str();

    if !explicit_intl && rest.len() <= rule.significant_digits {
        return rest.to_string();
    }

    let intl = rule.international_prefix;
    if explicit_intl {
        if !intl.is_empty() && rest.starts_with(intl) && rest.len() > intl.len() + 4 {
            rest = &rest[intl.len()..];
        }
    } else if !intl.is_empty()
        && rest.starts_with("00")
        && rest[2..].starts_with(intl)
        && rest.len() > 2 + intl.len() + 4
    {
        rest = &rest[2 + intl.len()..];
    } else {
        let local = rule.local_prefix;
        if !local.is_empty() && rest.starts_with(local) && rest.len() > local.len() + 4 {
            rest = &rest[local.len()..];
        }
    }

    if rest.len() > rule.significant_digits {
        rest[rest.len() - rule.significant_digits..].to_string()
    } else {
        rest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_australia() {
        let au = Some("Australia");
        assert_eq!(normalize_phone("+61 2 9999 0000", au), "299990000");
        assert_eq!(normalize_phone("0061 2 9999 0000", au), "299990000");
        assert_eq!(normalize_phone("0299990000", au), "299990000");
        assert_eq!(normalize_phone("(02) 9999-0000", au), "299990000");
    }

    #[test]
    fn test_normalize_phone_us() {
        let us = Some("United States");
        assert_eq!(normalize_phone("+1 (212) 555-1234", us), "2125551234");
        assert_eq!(normalize_phone("212-555-1234", us), "2125551234");
    }

    #[test]
    fn test_normalize_phone_too_short() {
        assert_eq!(normalize_phone("1234", Some("Australia")), "");
        assert_eq!(normalize_phone("ext. 42", None), "");
        assert_eq!(normalize_phone("", None), "");
    }

    #[test]
    fn test_country_rule_substring_match() {
        // "Australia (HQ)" still resolves the Australian rule.
        let r = country_rule(Some("Australia (HQ)"));
        assert_eq!(r.international_prefix, "61");
        // Unknown countries fall back to the default triple.
        let d = country_rule(Some("Atlantis"));
        assert_eq!(d.significant_digits, DEFAULT_RULE.significant_digits);
    }

    #[test]
    fn test_normalize_phone_idempotent() {
        let au = Some("Australia");
        for input in ["+61 2 9999 0000", "0061299990000", "0299990000", "9999 0000"] {
            let once = normalize_phone(input, au);
            assert_eq!(normalize_phone(&once, au), once, "input: {}", input);
        }
    }

    #[test]
    fn test_normalize_phone_idempotent_when_suffix_matches_calling_code() {
        // A French landline whose trunk-stripped form starts with "33" (the
        // French calling code) must not lose those digits on a second pass.
        let fr = Some("France");
        let once = normalize_phone("0333123456", fr);
        assert_eq!(once, "333123456");
        assert_eq!(normalize_phone(&once, fr), once);

        // Same shape for the UK: "44..." after trunk stripping.
        let uk = Some("United Kingdom");
        let once = normalize_phone("0441 234 5678", uk);
        assert_eq!(once, "4412345678");
        assert_eq!(normalize_phone(&once, uk), once);
    }
}
