// src/matching/chunk.rs
//
// Drives one page of source records end-to-end: fetch, normalize, batched
// candidate retrieval against both reference systems (concurrent), best-
// candidate scoring, AI validation of the ambiguous band, status resolution
// and aggregate statistics.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeMap;
use tokio::try_join;
use tokio_postgres::Row;

use crate::ai::validator::AiValidator;
use crate::matching::candidates::find_candidates_batch;
use crate::matching::scoring::{score_normalized, score_pair, ScoringConfig};
use crate::matching::status::resolve_status;
use crate::models::core::{
    Account, Candidate, CanonicalField, FieldMapping, NormalizedAccount, TargetSystem,
};
use crate::models::matching::{
    CrossRefStatus, MatchResult, MatchStatus, MatchedAccountRecord, SystemMatch, ValidationPair,
    ValidationVerdict,
};
use crate::models::stats::{ChunkResult, ChunkStats};
use crate::normalize::normalize_account;
use crate::utils::constants::{
    SOURCE_ACCOUNT_TABLE, VALIDATION_BAND_MAX, VALIDATION_BAND_MIN,
};
use crate::utils::db_connect::PgPool;

/// Candidates kept per source record per reference system.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 20;

/// Best candidate for one reference system, waiting for its verdict.
struct PendingMatch {
    candidate: Candidate,
    result: MatchResult,
    pair_id: Option<u32>,
}

pub async fn count_source_accounts(pool: &PgPool) -> Result<i64> {
    let conn = pool
        .get()
        .await
        .context("Chunk: failed to get DB connection for source count")?;
    let row = conn
        .query_one(
            &format!("SELECT COUNT(*) FROM {}", SOURCE_ACCOUNT_TABLE),
            &[],
        )
        .await
        .context("Chunk: failed to count source accounts")?;
    Ok(row.get(0))
}

/// Stably-ordered page read: `ORDER BY id` makes re-invocation for the same
/// offset idempotent against an unchanged store.
pub async fn fetch_source_page(
    pool: &PgPool,
    mapping: &FieldMapping,
    page_size: i64,
    offset: i64,
) -> Result<Vec<Account>> {
    let columns: Vec<String> = mapping.columns().map(|(c, _)| c.to_string()).collect();
    let query = format!(
        "SELECT id, {} FROM {} ORDER BY id LIMIT $1 OFFSET $2",
        columns.join(", "),
        SOURCE_ACCOUNT_TABLE
    );

    let conn = pool
        .get()
        .await
        .context("Chunk: failed to get DB connection for source page")?;
    let rows = conn
        .query(query.as_str(), &[&page_size, &offset])
        .await
        .context("Chunk: failed to fetch source page")?;

    Ok(rows
        .iter()
        .map(|row| source_account_from_row(row, mapping))
        .collect())
}

fn source_account_from_row(row: &Row, mapping: &FieldMapping) -> Account {
    let mut account = Account {
        id: row.get("id"),
        ..Default::default()
    };
    let mut payload = serde_json::Map::new();

    for (column, field) in mapping.columns() {
        let value: Option<String> = row.try_get::<_, Option<String>>(column).ok().flatten();
        payload.insert(
            column.to_string(),
            value
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        );
        match field {
            CanonicalField::Name => account.name = value,
            CanonicalField::Phone => account.phone = value,
            CanonicalField::Website => account.website = value,
            CanonicalField::Email => account.email = value,
            CanonicalField::BillingStreet => account.billing_street = value,
            CanonicalField::BillingCity => account.billing_city = value,
            CanonicalField::BillingPostalCode => account.billing_postal_code = value,
            CanonicalField::BillingCountry => account.billing_country = value,
        }
    }

    account.payload = serde_json::Value::Object(payload);
    account
}

/// Picks the single highest-scoring candidate. Strict `>` comparison keeps
/// the first-seen candidate on ties, so the stable retrieval ordering is a
/// deciding factor. Documented tie-break rule; do not relax to `>=`.
fn select_best(
    source: &Account,
    candidates: Vec<Candidate>,
    config: &ScoringConfig,
) -> Option<(Candidate, MatchResult)> {
    let source_country = source.billing_country.as_deref();
    // Source keys derived once per record, not once per candidate. Only the
    // sourceless-country fallback below needs them re-derived, since the
    // candidate's country then drives phone normalization for both sides.
    let source_keys = normalize_account(source, source_country);

    let mut best: Option<(Candidate, MatchResult)> = None;
    for candidate in candidates {
        let result = match (source_country, candidate.account.billing_country.as_deref()) {
            (None, country @ Some(_)) => {
                score_pair(source, &candidate.account, country, config)
            }
            _ => score_normalized(
                source,
                &source_keys,
                &candidate.account,
                source_country,
                config,
            ),
        };
        let is_better = best
            .as_ref()
            .map_or(true, |(_, current)| result.score > current.score);
        if is_better {
            best = Some((candidate, result));
        }
    }
    best
}

/// Ambiguous band: inclusive both ends. Below is auto-rejected, above is
/// auto-flagged; only scores inside go to the judge.
fn in_validation_band(score: i32) -> bool {
    (VALIDATION_BAND_MIN..=VALIDATION_BAND_MAX).contains(&score)
}

fn has_more(offset: i64, processed: usize, total: i64) -> bool {
    offset + (processed as i64) < total
}

/// A record is present in a reference system when that system's status is
/// CONFIRMED or REVIEW; REJECTED or no candidate does not count.
pub fn combine_statuses(
    dimensions: Option<MatchStatus>,
    salesforce: Option<MatchStatus>,
) -> CrossRefStatus {
    let dim_present = dimensions.map_or(false, |s| s.counts_as_present());
    let sf_present = salesforce.map_or(false, |s| s.counts_as_present());
    match (dim_present, sf_present) {
        (true, true) => CrossRefStatus::Both,
        (true, false) => CrossRefStatus::DimOnly,
        (false, true) => CrossRefStatus::SfOnly,
        (false, false) => CrossRefStatus::New,
    }
}

fn to_system_match(
    pending: PendingMatch,
    verdicts: &BTreeMap<u32, ValidationVerdict>,
) -> SystemMatch {
    let verdict = pending.pair_id.and_then(|id| verdicts.get(&id).cloned());
    let status = resolve_status(pending.result.score, verdict.as_ref());
    SystemMatch {
        candidate: pending.candidate.account,
        score: pending.result.score,
        matched_fields: pending.result.matched_fields,
        verdict,
        status,
    }
}

/// Processes one page of source records. The sole entry point surrounding
/// components call; read-only against the store and safe to re-invoke for
/// the same offset. Output preserves the input page order and never drops a
/// record, even one with zero candidates.
pub async fn process_chunk(
    pool: &PgPool,
    validator: &AiValidator,
    mapping: &FieldMapping,
    page_size: i64,
    offset: i64,
    enable_ai: bool,
) -> Result<ChunkResult> {
    let scoring_config = ScoringConfig::default();

    let total = count_source_accounts(pool).await?;
    let page = fetch_source_page(pool, mapping, page_size, offset).await?;
    if page.is_empty() {
        debug!("Chunk at offset {} is empty (total {})", offset, total);
        return Ok(ChunkResult::empty(total));
    }
    info!(
        "Processing chunk: offset={} page={} total={} ai={}",
        offset,
        page.len(),
        total,
        enable_ai
    );

    let batch: Vec<(i64, NormalizedAccount)> = page
        .iter()
        .map(|a| (a.id, normalize_account(a, a.billing_country.as_deref())))
        .collect();

    // Two independent batched retrievals; both must land before scoring.
    // A failure or timeout here is fatal to the chunk.
    let (mut dim_candidates, mut sf_candidates) = try_join!(
        find_candidates_batch(pool, &batch, TargetSystem::Dimensions, DEFAULT_CANDIDATE_LIMIT),
        find_candidates_batch(pool, &batch, TargetSystem::Salesforce, DEFAULT_CANDIDATE_LIMIT),
    )?;

    let mut pending: Vec<(Option<PendingMatch>, Option<PendingMatch>)> =
        Vec::with_capacity(page.len());
    let mut validation_pairs: Vec<ValidationPair> = Vec::new();
    // Dense 1-based pair ids, scoped to this chunk invocation: the only join
    // key between prompt and judge response.
    let mut next_pair_id: u32 = 1;

    for source in &page {
        let mut slots: [Option<PendingMatch>; 2] = [None, None];
        for (slot, system) in slots
            .iter_mut()
            .zip([TargetSystem::Dimensions, TargetSystem::Salesforce])
        {
            let candidates = match system {
                TargetSystem::Dimensions => dim_candidates.remove(&source.id),
                TargetSystem::Salesforce => sf_candidates.remove(&source.id),
            }
            .unwrap_or_default();

            if let Some((candidate, result)) = select_best(source, candidates, &scoring_config) {
                let mut pending_match = PendingMatch {
                    candidate,
                    result,
                    pair_id: None,
                };
                if enable_ai && in_validation_band(pending_match.result.score) {
                    pending_match.pair_id = Some(next_pair_id);
                    validation_pairs.push(ValidationPair {
                        id: next_pair_id,
                        source: source.clone(),
                        target: pending_match.candidate.account.clone(),
                        heuristic_score: pending_match.result.score,
                        matched_fields: pending_match.result.matched_fields.clone(),
                        target_system: system,
                    });
                    next_pair_id += 1;
                }
                *slot = Some(pending_match);
            }
        }
        let [dim, sf] = slots;
        pending.push((dim, sf));
    }

    // One validator call for all of the chunk's pairs. The validator owns
    // sub-batching and degrades internally; it never fails the chunk.
    let verdicts = if enable_ai && !validation_pairs.is_empty() {
        validator.validate_batch(&validation_pairs).await
    } else {
        BTreeMap::new()
    };

    let mut stats = ChunkStats {
        ai_validated: validation_pairs.len(),
        ..Default::default()
    };

    let mut matches = Vec::with_capacity(page.len());
    for (source, (dim, sf)) in page.into_iter().zip(pending) {
        let dimensions = dim.map(|p| to_system_match(p, &verdicts));
        let salesforce = sf.map(|p| to_system_match(p, &verdicts));
        let final_status = combine_statuses(
            dimensions.as_ref().map(|m| m.status),
            salesforce.as_ref().map(|m| m.status),
        );
        stats.record(final_status);
        matches.push(MatchedAccountRecord {
            source,
            dimensions,
            salesforce,
            final_status,
        });
    }

    let processed_count = matches.len();
    Ok(ChunkResult {
        matches,
        total_source_accounts: total,
        processed_count,
        has_more: has_more(offset, processed_count, total),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_statuses() {
        use MatchStatus::*;
        assert_eq!(
            combine_statuses(Some(Confirmed), Some(Review)),
            CrossRefStatus::Both
        );
        assert_eq!(
            combine_statuses(Some(Review), None),
            CrossRefStatus::DimOnly
        );
        assert_eq!(
            combine_statuses(Some(Rejected), Some(Confirmed)),
            CrossRefStatus::SfOnly
        );
        assert_eq!(
            combine_statuses(Some(Rejected), Some(Rejected)),
            CrossRefStatus::New
        );
        assert_eq!(combine_statuses(None, None), CrossRefStatus::New);
    }

    #[test]
    fn test_validation_band_is_inclusive() {
        assert!(!in_validation_band(VALIDATION_BAND_MIN - 1));
        assert!(in_validation_band(VALIDATION_BAND_MIN));
        assert!(in_validation_band(VALIDATION_BAND_MAX));
        assert!(!in_validation_band(VALIDATION_BAND_MAX + 1));
    }

    #[test]
    fn test_has_more_arithmetic() {
        assert!(has_more(0, 100, 250));
        assert!(has_more(100, 100, 250));
        assert!(!has_more(200, 50, 250));
        // Offset past the end: empty page, nothing more.
        assert!(!has_more(300, 0, 250));
    }

    #[test]
    fn test_select_best_first_seen_wins_on_tie() {
        let source = Account {
            name: Some("Acme Pty Ltd".to_string()),
            ..Default::default()
        };
        let make_candidate = |id: i64| Candidate {
            account: Account {
                id,
                name: Some("Acme Limited".to_string()),
                ..Default::default()
            },
            priority: 80,
        };
        let candidates = vec![make_candidate(11), make_candidate(22), make_candidate(33)];
        let (winner, result) =
            select_best(&source, candidates, &ScoringConfig::default()).expect("best exists");
        // All three score identically; the first in retrieval order wins.
        assert_eq!(winner.account.id, 11);
        assert_eq!(result.matched_fields, vec!["name".to_string()]);
    }

    #[test]
    fn test_select_best_empty_candidates() {
        let source = Account::default();
        assert!(select_best(&source, Vec::new(), &ScoringConfig::default()).is_none());
    }

    #[test]
    fn test_select_best_prefers_higher_score() {
        let source = Account {
            name: Some("Acme Pty Ltd".to_string()),
            phone: Some("0299990000".to_string()),
            billing_country: Some("Australia".to_string()),
            ..Default::default()
        };
        let name_only = Candidate {
            account: Account {
                id: 1,
                name: Some("Acme".to_string()),
                ..Default::default()
            },
            priority: 70,
        };
        let name_and_phone = Candidate {
            account: Account {
                id: 2,
                name: Some("Acme".to_string()),
                phone: Some("+61 2 9999 0000".to_string()),
                ..Default::default()
            },
            priority: 100,
        };
        let (winner, result) = select_best(
            &source,
            vec![name_only, name_and_phone],
            &ScoringConfig::default(),
        )
        .expect("best exists");
        assert_eq!(winner.account.id, 2);
        assert!(result.matched_fields.contains(&"phone".to_string()));
    }

    #[test]
    fn test_select_best_uses_candidate_country_when_source_has_none() {
        // US numbers keep 10 significant digits; the default rule keeps 9.
        // The phones only line up if the candidate's country drives both
        // sides' normalization.
        let source = Account {
            name: Some("Acme".to_string()),
            phone: Some("+1 212 555 1234".to_string()),
            ..Default::default()
        };
        let candidate = Candidate {
            account: Account {
                id: 5,
                name: Some("Acme".to_string()),
                phone: Some("(212) 555-1234".to_string()),
                billing_country: Some("United States".to_string()),
                ..Default::default()
            },
            priority: 100,
        };
        let (_, result) = select_best(&source, vec![candidate], &ScoringConfig::default())
            .expect("best exists");
        assert!(result.matched_fields.contains(&"phone".to_string()));
        assert_eq!(result.score, 115);
    }
}
