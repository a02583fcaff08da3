// src/ai/validator.rs
//
// Adapter around the LLM judge backend. All text-parsing fragility lives
// behind this boundary: callers get one typed verdict per requested pair id,
// no matter how degraded the model response is.

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::models::core::Account;
use crate::models::matching::{ValidationPair, ValidationVerdict};
use crate::normalize::normalize_account;

/// Configuration for the judge backend connection.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub base_url: String,
    pub model: String,
    /// Pairs per prompt.
    pub sub_batch_size: usize,
    /// Sub-batches in flight at a time. A throughput courtesy to the judge
    /// backend, not a correctness requirement.
    pub max_in_flight: usize,
    pub request_timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            sub_batch_size: 5,
            max_in_flight: 2,
            request_timeout_secs: 120,
        }
    }
}

impl ValidatorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            sub_batch_size: env_usize("AI_SUB_BATCH_SIZE", defaults.sub_batch_size),
            max_in_flight: env_usize("AI_CONCURRENCY", defaults.max_in_flight),
            request_timeout_secs: std::env::var("AI_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[derive(Serialize)]
struct JudgeRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: JudgeOptions,
}

#[derive(Serialize)]
struct JudgeOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct JudgeResponse {
    response: String,
}

pub struct AiValidator {
    config: ValidatorConfig,
    client: Client,
}

impl AiValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Judges a chunk's validation pairs in bounded-concurrency sub-batches.
    ///
    /// Never fails as a whole: transport errors and timeouts degrade the
    /// affected sub-batch to error verdicts, unparseable lines are skipped,
    /// and every requested id is present in the returned map (sorted by id).
    pub async fn validate_batch(
        &self,
        pairs: &[ValidationPair],
    ) -> BTreeMap<u32, ValidationVerdict> {
        let mut verdicts: BTreeMap<u32, ValidationVerdict> = BTreeMap::new();
        if pairs.is_empty() {
            return verdicts;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let tasks = pairs.chunks(self.config.sub_batch_size).map(|sub_batch| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let ids: Vec<u32> = sub_batch.iter().map(|p| p.id).collect();
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return error_verdicts(&ids, "validator semaphore closed"),
                };
                match self.judge_sub_batch(sub_batch).await {
                    Ok(text) => parse_verdicts(&text, &ids),
                    Err(e) => {
                        warn!(
                            "AI sub-batch of {} pairs failed: {:#}. Filling error verdicts.",
                            ids.len(),
                            e
                        );
                        error_verdicts(&ids, &e.to_string())
                    }
                }
            }
        });

        for sub_result in join_all(tasks).await {
            for (id, verdict) in sub_result {
                verdicts.entry(id).or_insert(verdict);
            }
        }

        fill_missing_verdicts(&mut verdicts, pairs.iter().map(|p| p.id));
        verdicts
    }

    async fn judge_sub_batch(&self, sub_batch: &[ValidationPair]) -> Result<String> {
        let prompt = build_prompt(sub_batch);
        debug!(
            "Dispatching AI sub-batch of {} pairs ({} prompt chars)",
            sub_batch.len(),
            prompt.len()
        );

        let request = JudgeRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: JudgeOptions { temperature: 0.0 },
        };

        let call = async {
            let response = self
                .client
                .post(format!("{}/api/generate", self.config.base_url))
                .json(&request)
                .send()
                .await
                .context("Failed to send request to judge backend")?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Judge backend returned status {}",
                    response.status()
                ));
            }

            let body: JudgeResponse = response
                .json()
                .await
                .context("Failed to decode judge backend response")?;
            Ok(body.response)
        };

        timeout(Duration::from_secs(self.config.request_timeout_secs), call)
            .await
            .map_err(|_| {
                anyhow!(
                    "Judge request timed out after {}s",
                    self.config.request_timeout_secs
                )
            })?
    }
}

fn describe_account(account: &Account) -> String {
    let normalized = normalize_account(account, account.billing_country.as_deref());
    format!(
        "name=\"{}\" phone=\"{}\" domain=\"{}\" city=\"{}\" country=\"{}\"",
        account.name.as_deref().unwrap_or(""),
        account.phone.as_deref().unwrap_or(""),
        normalized.domain_key(),
        account.billing_city.as_deref().unwrap_or(""),
        account.billing_country.as_deref().unwrap_or(""),
    )
}

/// One prompt per sub-batch: the pairs, the decision rules, and a strict
/// CSV-like output contract keyed by pair id.
fn build_prompt(pairs: &[ValidationPair]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a data-quality analyst comparing pairs of business accounts from two systems.\n\
         For each pair decide whether record A and record B are the same company.\n\n",
    );

    for pair in pairs {
        let _ = writeln!(prompt, "Pair {}:", pair.id);
        let _ = writeln!(prompt, "  A: {}", describe_account(&pair.source));
        let _ = writeln!(prompt, "  B: {}", describe_account(&pair.target));
        let _ = writeln!(prompt, "  Heuristic score: {}", pair.heuristic_score);
    }

    prompt.push_str(
        "\nDecision rules:\n\
         - Same website domain means same company.\n\
         - Same phone number means same company.\n\
         - Ignore legal-entity suffixes (Ltd, Inc, GmbH, Pty, ...).\n\
         - Different countries with different domains means different companies.\n\n\
         Answer with exactly one line per pair, in this format and nothing else:\n\
         ID,DECISION,CONFIDENCE,REASON\n\
         where DECISION is YES or NO and CONFIDENCE is 0-100.\n\
         No header line, no extra prose.\n",
    );
    prompt
}

/// Fills a default verdict for every requested id the model never answered.
/// Absence of a verdict is "no information", not a negative.
fn fill_missing_verdicts(
    verdicts: &mut BTreeMap<u32, ValidationVerdict>,
    requested_ids: impl Iterator<Item = u32>,
) {
    for id in requested_ids {
        verdicts.entry(id).or_insert_with(|| ValidationVerdict {
            is_match: false,
            confidence: 0,
            reasoning: "AI did not return result".to_string(),
            error: None,
        });
    }
}

fn error_verdicts(ids: &[u32], message: &str) -> HashMap<u32, ValidationVerdict> {
    ids.iter()
        .map(|id| {
            (
                *id,
                ValidationVerdict {
                    is_match: false,
                    confidence: 0,
                    reasoning: String::new(),
                    error: Some(message.to_string()),
                },
            )
        })
        .collect()
}

fn default_confidence(is_match: bool) -> i32 {
    if is_match {
        70
    } else {
        85
    }
}

/// Parses an approximately-CSV judge response. Tolerates code fences,
/// leading junk, unknown ids, duplicates and missing confidence; the model
/// may omit confidence but not the decision.
pub fn parse_verdicts(response: &str, requested_ids: &[u32]) -> HashMap<u32, ValidationVerdict> {
    let requested: HashSet<u32> = requested_ids.iter().copied().collect();
    let mut verdicts: HashMap<u32, ValidationVerdict> = HashMap::new();

    for raw_line in response.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        // Strip leading non-numeric junk ("- ", "Pair ", list markers, ...).
        let start = match line.find(|c: char| c.is_ascii_digit()) {
            Some(i) => i,
            None => continue,
        };
        let line = &line[start..];

        let mut tokens = line.split(',');
        let id = match tokens.next().map(|t| t.trim().parse::<u32>()) {
            Some(Ok(id)) => id,
            _ => {
                debug!("Skipping unparseable judge line: '{}'", raw_line);
                continue;
            }
        };
        if !requested.contains(&id) {
            warn!("Judge returned verdict for unknown pair id {}; discarding", id);
            continue;
        }
        if verdicts.contains_key(&id) {
            warn!("Duplicate verdict for pair id {}; keeping the first", id);
            continue;
        }

        let decision = match tokens.next() {
            Some(d) => d.trim().to_ascii_uppercase(),
            None => {
                warn!("Judge line for pair {} has no decision token; skipping", id);
                continue;
            }
        };
        let is_match = matches!(decision.as_str(), "YES" | "Y");

        let rest: Vec<&str> = tokens.collect();
        let (confidence, reasoning) = match rest.split_first() {
            Some((first, remainder)) => {
                match first.trim().trim_end_matches('%').parse::<i32>() {
                    Ok(c) if (0..=100).contains(&c) => {
                        (c, remainder.join(",").trim().to_string())
                    }
                    _ => (default_confidence(is_match), rest.join(",").trim().to_string()),
                }
            }
            None => (default_confidence(is_match), String::new()),
        };

        verdicts.insert(
            id,
            ValidationVerdict {
                is_match,
                confidence,
                reasoning,
                error: None,
            },
        );
    }

    verdicts
}
