// src/models/matching.rs

use serde::{Deserialize, Serialize};

use crate::models::core::{Account, TargetSystem};

/// Heuristic scoring output for exactly one (source, candidate) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: i32,
    pub matched_fields: Vec<String>,
    pub is_above_threshold: bool,
}

/// One borderline pair queued for AI validation. The `id` is a dense 1-based
/// sequence scoped to a single chunk invocation and is the only join key
/// between the prompt and the judge's response.
#[derive(Debug, Clone)]
pub struct ValidationPair {
    pub id: u32,
    pub source: Account,
    pub target: Account,
    pub heuristic_score: i32,
    pub matched_fields: Vec<String>,
    pub target_system: TargetSystem,
}

/// The judge's decision for one validation pair. A sub-batch transport
/// failure is surfaced through `error` rather than hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_match: bool,
    pub confidence: i32,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final per-reference-system classification for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Confirmed,
    Rejected,
    Review,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Confirmed => "CONFIRMED",
            MatchStatus::Rejected => "REJECTED",
            MatchStatus::Review => "REVIEW",
        }
    }

    /// A record counts as present in a reference system only when the match
    /// was confirmed or is still under review.
    pub fn counts_as_present(&self) -> bool {
        matches!(self, MatchStatus::Confirmed | MatchStatus::Review)
    }
}

/// Aggregate cross-reference outcome for one source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossRefStatus {
    Both,
    DimOnly,
    SfOnly,
    New,
}

impl CrossRefStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossRefStatus::Both => "BOTH",
            CrossRefStatus::DimOnly => "DIM_ONLY",
            CrossRefStatus::SfOnly => "SF_ONLY",
            CrossRefStatus::New => "NEW",
        }
    }
}

/// Best match found in one reference system for one source record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMatch {
    pub candidate: Account,
    pub score: i32,
    pub matched_fields: Vec<String>,
    pub verdict: Option<ValidationVerdict>,
    pub status: MatchStatus,
}

/// Per-source-record chunk output. Created once per record per chunk call
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedAccountRecord {
    pub source: Account,
    pub dimensions: Option<SystemMatch>,
    pub salesforce: Option<SystemMatch>,
    pub final_status: CrossRefStatus,
}
