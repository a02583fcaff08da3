// src/utils/constants.rs

/// Source feed table. The reference tables live on
/// [`crate::models::core::TargetSystem::table_name`].
pub const SOURCE_ACCOUNT_TABLE: &str = "public.source_account";

/// Ambiguous band (inclusive both ends). Scores inside it go to AI
/// validation; below is auto-rejected, above is auto-flagged for review.
pub const VALIDATION_BAND_MIN: i32 = 20;
pub const VALIDATION_BAND_MAX: i32 = 100;

/// AI verdict confidence tiers used by the status resolver.
pub const AI_HIGH_CONFIDENCE: i32 = 80;
pub const AI_MID_CONFIDENCE: i32 = 60;

/// Heuristic-score gates applied to mid-confidence verdicts.
pub const AI_CONFIRM_MIN_SCORE: i32 = 85;
pub const AI_REJECT_MAX_SCORE: i32 = 50;

/// Trigram similarity floor for name-based candidate retrieval.
pub const TRGM_SIMILARITY_FLOOR: f32 = 0.3;

/// Cap on candidates returned per retrieval predicate per source account.
pub const MAX_CANDIDATES_PER_FIELD: i64 = 20;

/// Timeout for each batched candidate-retrieval query. A timeout here is
/// fatal to the chunk; there is no safe partial-candidate fallback.
pub const CANDIDATE_QUERY_TIMEOUT_SECS: u64 = 60;
