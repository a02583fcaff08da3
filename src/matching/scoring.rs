// src/matching/scoring.rs

use strsim::sorensen_dice;

use crate::models::core::{Account, NormalizedAccount};
use crate::models::matching::MatchResult;
use crate::normalize::normalize_account;
use crate::utils::constants::VALIDATION_BAND_MIN;

/// Name carries separate point values for exact-normalized equality and for
/// a close-but-not-equal similarity hit.
#[derive(Debug, Clone, Copy)]
pub struct NameWeight {
    pub exact: i32,
    pub alike: i32,
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub name: NameWeight,
    pub phone: i32,
    pub website: i32,
    pub billing_street: i32,
    pub billing_city: i32,
    /// Bonus when one side's corporate email domain equals the other side's
    /// website domain (website-less sides only).
    pub cross_domain_bonus: i32,
    pub name_partial_threshold: f64,
    pub field_partial_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            name: NameWeight {
                exact: 85,
                alike: 60,
            },
            phone: 30,
            website: 25,
            billing_street: 15,
            billing_city: 10,
            cross_domain_bonus: 25,
            name_partial_threshold: 0.6,
            field_partial_threshold: 0.8,
        }
    }
}

impl ScoringConfig {
    /// Advisory ceiling for UI display; the engine does not clamp to it.
    pub fn max_possible_score(&self) -> i32 {
        self.name.exact
            + self.phone
            + self.website
            + self.billing_street
            + self.billing_city
            + self.cross_domain_bonus
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

/// Computes the weighted match score for one (source, candidate) pair.
/// Deterministic: no randomness, no external calls; contributions are never
/// negative and phone/website earn exact-equality credit only.
pub fn score_pair(
    source: &Account,
    target: &Account,
    country: Option<&str>,
    config: &ScoringConfig,
) -> MatchResult {
    let s = normalize_account(source, country);
    score_normalized(source, &s, target, country, config)
}

/// Same as [`score_pair`] with the source side's keys already derived.
/// Callers comparing one source against many candidates normalize the source
/// once and reuse it here; `country` must be the one `s` was derived with.
pub fn score_normalized(
    source: &Account,
    s: &NormalizedAccount,
    target: &Account,
    country: Option<&str>,
    config: &ScoringConfig,
) -> MatchResult {
    let t = normalize_account(target, country);

    let mut score: i32 = 0;
    let mut matched_fields: Vec<String> = Vec::new();

    // Name: exact weight on equality, alike weight scaled by similarity.
    if present(&source.name) && present(&target.name) && !s.name.is_empty() && !t.name.is_empty() {
        if s.name == t.name {
            score += config.name.exact;
            matched_fields.push("name".to_string());
        } else {
            let similarity = sorensen_dice(&s.name, &t.name);
            if similarity > config.name_partial_threshold {
                score += (config.name.alike as f64 * similarity).round() as i32;
                matched_fields.push("name".to_string());
            }
        }
    }

    // Phone and website collisions are load-bearing: exact-equality only.
    if present(&source.phone)
        && present(&target.phone)
        && !s.phone.is_empty()
        && s.phone == t.phone
    {
        score += config.phone;
        matched_fields.push("phone".to_string());
    }

    if present(&source.website)
        && present(&target.website)
        && !s.website.is_empty()
        && s.website == t.website
    {
        score += config.website;
        matched_fields.push("website".to_string());
    }

    if present(&source.billing_street) && present(&target.billing_street) {
        if let Some(points) = fuzzy_points(
            &s.billing_street,
            &t.billing_street,
            config.billing_street,
            config.field_partial_threshold,
        ) {
            score += points;
            matched_fields.push("billing_street".to_string());
        }
    }

    if present(&source.billing_city) && present(&target.billing_city) {
        if let Some(points) = fuzzy_points(
            &s.billing_city,
            &t.billing_city,
            config.billing_city,
            config.field_partial_threshold,
        ) {
            score += points;
            matched_fields.push("billing_city".to_string());
        }
    }

    // Cross-field bonus: a side without a website can still prove domain
    // ownership through a corporate email address.
    let cross_match = (s.website.is_empty()
        && s.email_domain.as_deref().map_or(false, |d| {
            !t.website.is_empty() && d == t.website
        }))
        || (t.website.is_empty()
            && t.email_domain.as_deref().map_or(false, |d| {
                !s.website.is_empty() && d == s.website
            }));
    if cross_match {
        score += config.cross_domain_bonus;
        matched_fields.push("email_domain".to_string());
    }

    MatchResult {
        score,
        matched_fields,
        is_above_threshold: score >= VALIDATION_BAND_MIN,
    }
}

/// Exact weight on normalized equality, `round(weight × similarity)` when
/// similarity clears the field threshold, nothing otherwise.
fn fuzzy_points(a: &str, b: &str, weight: i32, threshold: f64) -> Option<i32> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(weight);
    }
    let similarity = sorensen_dice(a, b);
    if similarity > threshold {
        Some((weight as f64 * similarity).round() as i32)
    } else {
        None
    }
}
