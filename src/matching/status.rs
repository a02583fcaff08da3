// src/matching/status.rs

use crate::models::matching::{MatchStatus, ValidationVerdict};
use crate::utils::constants::{
    AI_CONFIRM_MIN_SCORE, AI_HIGH_CONFIDENCE, AI_MID_CONFIDENCE, AI_REJECT_MAX_SCORE,
    VALIDATION_BAND_MAX, VALIDATION_BAND_MIN,
};

/// Combines the heuristic score with an optional AI verdict into the final
/// per-reference status. Pure: identical inputs always produce the same
/// output, and there is no memory across calls.
///
/// A verdict that carries a transport error is treated as "no information",
/// never as an implicit negative.
///
/// NOTE: a score above the validation ceiling without a verdict resolves to
/// REVIEW, not CONFIRMED — the match was too strong to be sent to the judge,
/// so a human confirms it instead. Observed behavior preserved pending
/// product clarification.
pub fn resolve_status(heuristic_score: i32, verdict: Option<&ValidationVerdict>) -> MatchStatus {
    let verdict = verdict.filter(|v| v.error.is_none());

    match verdict {
        None => {
            if heuristic_score > VALIDATION_BAND_MAX {
                MatchStatus::Review
            } else if heuristic_score < VALIDATION_BAND_MIN {
                MatchStatus::Rejected
            } else {
                MatchStatus::Review
            }
        }
        Some(v) => {
            if v.confidence >= AI_HIGH_CONFIDENCE {
                if v.is_match {
                    MatchStatus::Confirmed
                } else {
                    MatchStatus::Rejected
                }
            } else if v.confidence >= AI_MID_CONFIDENCE {
                if v.is_match && heuristic_score >= AI_CONFIRM_MIN_SCORE {
                    MatchStatus::Confirmed
                } else if !v.is_match && heuristic_score < AI_REJECT_MAX_SCORE {
                    MatchStatus::Rejected
                } else {
                    MatchStatus::Review
                }
            } else {
                MatchStatus::Review
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(is_match: bool, confidence: i32) -> ValidationVerdict {
        ValidationVerdict {
            is_match,
            confidence,
            reasoning: String::new(),
            error: None,
        }
    }

    #[test]
    fn test_no_verdict_cases() {
        assert_eq!(resolve_status(90, None), MatchStatus::Review);
        // Above the validation ceiling still goes to review, not auto-confirm.
        assert_eq!(resolve_status(110, None), MatchStatus::Review);
        assert_eq!(resolve_status(10, None), MatchStatus::Rejected);
        assert_eq!(resolve_status(20, None), MatchStatus::Review);
    }

    #[test]
    fn test_high_confidence_verdict_decides() {
        assert_eq!(
            resolve_status(70, Some(&verdict(true, 85))),
            MatchStatus::Confirmed
        );
        assert_eq!(
            resolve_status(40, Some(&verdict(false, 90))),
            MatchStatus::Rejected
        );
    }

    #[test]
    fn test_mid_confidence_needs_heuristic_support() {
        assert_eq!(
            resolve_status(90, Some(&verdict(true, 65))),
            MatchStatus::Confirmed
        );
        assert_eq!(
            resolve_status(60, Some(&verdict(true, 65))),
            MatchStatus::Review
        );
        assert_eq!(
            resolve_status(30, Some(&verdict(false, 70))),
            MatchStatus::Rejected
        );
        assert_eq!(
            resolve_status(60, Some(&verdict(false, 70))),
            MatchStatus::Review
        );
    }

    #[test]
    fn test_low_confidence_always_reviews() {
        assert_eq!(
            resolve_status(95, Some(&verdict(true, 40))),
            MatchStatus::Review
        );
        assert_eq!(
            resolve_status(25, Some(&verdict(false, 0))),
            MatchStatus::Review
        );
    }

    #[test]
    fn test_errored_verdict_is_no_information() {
        let errored = ValidationVerdict {
            is_match: false,
            confidence: 0,
            reasoning: String::new(),
            error: Some("judge backend unreachable".to_string()),
        };
        // Falls through to the no-verdict table instead of rejecting.
        assert_eq!(resolve_status(90, Some(&errored)), MatchStatus::Review);
        assert_eq!(resolve_status(10, Some(&errored)), MatchStatus::Rejected);
    }
}
