// src/matching/candidates.rs
//
// Batched candidate retrieval. One set-oriented query per target system per
// batch — never one query per record — combining three predicate classes:
// exact normalized phone (priority 100), exact domain (priority 95), and
// trigram name similarity (priority scaled 0-80).

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::timeout;
use tokio_postgres::Row;

use crate::models::core::{Account, Candidate, NormalizedAccount, TargetSystem};
use crate::utils::constants::{
    CANDIDATE_QUERY_TIMEOUT_SECS, MAX_CANDIDATES_PER_FIELD, TRGM_SIMILARITY_FLOOR,
};
use crate::utils::db_connect::PgPool;

pub const PRIORITY_PHONE_EXACT: i32 = 100;
pub const PRIORITY_DOMAIN_EXACT: i32 = 95;

/// Retrieves plausible matches for a whole batch of source records from one
/// reference system. Returns candidates per source id, ordered by priority
/// tier (highest first, target id as the stable tie-break) and capped at
/// `limit_per_account`. Sources without any usable key contribute neither
/// candidates nor query cost; an empty candidate list is a normal outcome.
pub async fn find_candidates_batch(
    pool: &PgPool,
    batch: &[(i64, NormalizedAccount)],
    target_system: TargetSystem,
    limit_per_account: usize,
) -> Result<HashMap<i64, Vec<Candidate>>> {
    let mut phone_ids: Vec<i64> = Vec::new();
    let mut phone_keys: Vec<String> = Vec::new();
    let mut domain_ids: Vec<i64> = Vec::new();
    let mut domain_keys: Vec<String> = Vec::new();
    let mut name_ids: Vec<i64> = Vec::new();
    let mut name_keys: Vec<String> = Vec::new();

    for (source_id, normalized) in batch {
        if !normalized.phone.is_empty() {
            phone_ids.push(*source_id);
            phone_keys.push(normalized.phone.clone());
        }
        let domain = normalized.domain_key();
        if !domain.is_empty() {
            domain_ids.push(*source_id);
            domain_keys.push(domain.to_string());
        }
        if !normalized.name.is_empty() {
            name_ids.push(*source_id);
            name_keys.push(normalized.name.clone());
        }
    }

    if phone_ids.is_empty() && domain_ids.is_empty() && name_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let table = target_system.table_name();
    let query = format!(
        "SELECT c.source_id, c.priority,
                a.id, a.name, a.phone, a.website, a.email,
                a.billing_street, a.billing_city, a.billing_postal_code,
                a.billing_country, a.payload
         FROM (
             SELECT pk.source_id, t.id AS target_id, {phone_priority} AS priority
             FROM unnest($1::bigint[], $2::text[]) AS pk(source_id, key)
             JOIN {table} t ON t.normalized_phone = pk.key
           UNION ALL
             SELECT dk.source_id, t.id, {domain_priority}
             FROM unnest($3::bigint[], $4::text[]) AS dk(source_id, key)
             JOIN {table} t ON t.normalized_domain = dk.key
           UNION ALL
             SELECT nk.source_id, nt.id, nt.priority
             FROM unnest($5::bigint[], $6::text[]) AS nk(source_id, key)
             JOIN LATERAL (
                 SELECT t.id,
                        (similarity(t.normalized_name, nk.key) * 80.0)::int AS priority
                 FROM {table} t
                 WHERE t.normalized_name % nk.key
                   AND similarity(t.normalized_name, nk.key) >= $7
                 ORDER BY t.normalized_name <-> nk.key
                 LIMIT $8
             ) nt ON TRUE
         ) c
         JOIN {table} a ON a.id = c.target_id
         ORDER BY c.source_id, c.priority DESC, c.target_id",
        table = table,
        phone_priority = PRIORITY_PHONE_EXACT,
        domain_priority = PRIORITY_DOMAIN_EXACT,
    );

    let conn = pool.get().await.with_context(|| {
        format!(
            "Candidates: failed to get DB connection for {} retrieval",
            target_system.as_str()
        )
    })?;

    let rows = timeout(
        Duration::from_secs(CANDIDATE_QUERY_TIMEOUT_SECS),
        conn.query(
            query.as_str(),
            &[
                &phone_ids,
                &phone_keys,
                &domain_ids,
                &domain_keys,
                &name_ids,
                &name_keys,
                &TRGM_SIMILARITY_FLOOR,
                &MAX_CANDIDATES_PER_FIELD,
            ],
        ),
    )
    .await
    .map_err(|_| {
        anyhow!(
            "Candidate retrieval against {} timed out after {}s",
            target_system.as_str(),
            CANDIDATE_QUERY_TIMEOUT_SECS
        )
    })?
    .with_context(|| {
        format!(
            "Candidates: batched retrieval query against {} failed",
            target_system.as_str()
        )
    })?;

    debug!(
        "Candidates: {} raw rows from {} for batch of {} sources",
        rows.len(),
        target_system.as_str(),
        batch.len()
    );

    // Rows arrive ordered by (source_id, priority DESC, target_id), so the
    // first sighting of a (source, target) pair carries its highest tier.
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut candidates: HashMap<i64, Vec<Candidate>> = HashMap::new();

    for row in &rows {
        let source_id: i64 = row.get("source_id");
        let target_id: i64 = row.get("id");
        if !seen.insert((source_id, target_id)) {
            continue;
        }
        let per_account = candidates.entry(source_id).or_default();
        if per_account.len() >= limit_per_account {
            continue;
        }
        per_account.push(Candidate {
            account: account_from_row(row),
            priority: row.get("priority"),
        });
    }

    Ok(candidates)
}

fn account_from_row(row: &Row) -> Account {
    let text = |column: &str| -> Option<String> {
        row.try_get::<_, Option<String>>(column).ok().flatten()
    };
    Account {
        id: row.get("id"),
        name: text("name"),
        phone: text("phone"),
        website: text("website"),
        email: text("email"),
        billing_street: text("billing_street"),
        billing_city: text("billing_city"),
        billing_postal_code: text("billing_postal_code"),
        billing_country: text("billing_country"),
        payload: row
            .try_get::<_, Option<serde_json::Value>>("payload")
            .ok()
            .flatten()
            .unwrap_or(serde_json::Value::Null),
    }
}
