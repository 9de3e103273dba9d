// src/signals/disagreement.rs
use std::collections::HashSet;

use serde::Deserialize;

use crate::config::Thresholds;
use crate::error::SignalError;
use crate::signals::agreement::{AgreementIndex, ResolvedAgreement, ThoughtQuestions};
use crate::signals::ParticipantRecords;

/// When is an authored response "universally disagreed"?
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementPolicy {
    /// Overall agreement rate below the threshold.
    #[default]
    AllOnly,
    /// Overall rate below the threshold and, when segment rates exist, at least
    /// `universal_disagreement_coverage` of the major segments below `segment_disagreement`.
    SegmentCoverage,
}

impl DisagreementPolicy {
    fn is_disagreed(self, resolved: &ResolvedAgreement<'_>, t: &Thresholds) -> bool {
        if resolved.all >= t.universal_disagreement {
            return false;
        }
        match self {
            DisagreementPolicy::AllOnly => true,
            DisagreementPolicy::SegmentCoverage => {
                let Some(segments) = resolved.segments.filter(|s| !s.is_empty()) else {
                    return true;
                };
                let low = segments
                    .values()
                    .filter(|r| **r < t.segment_disagreement)
                    .count();
                low as f64 / segments.len() as f64 >= t.universal_disagreement_coverage
            }
        }
    }
}

/// Share of the participant's distinct authored responses that the population rejected.
///
/// Responses whose rate cannot be resolved are left out of the denominator; with nothing
/// evaluated the result is 0.0. A resolved rate outside [0, 1] is an error.
pub fn universal_disagreement_fraction<'a>(
    participant_id: &str,
    records: &ParticipantRecords<'a>,
    thoughts: &ThoughtQuestions<'a>,
    agreement: &AgreementIndex<'a>,
    thresholds: &Thresholds,
    policy: DisagreementPolicy,
) -> Result<f64, SignalError> {
    let mut seen = HashSet::new();
    let mut evaluated = 0usize;
    let mut disagreed = 0usize;

    for rec in &records.authored {
        if !seen.insert(rec.thought_id.as_str()) {
            continue;
        }
        let Some(question) = thoughts.question_of(&rec.thought_id) else {
            continue;
        };
        let Some(resolved) = agreement.resolve(question, participant_id) else {
            continue;
        };
        if !(0.0..=1.0).contains(&resolved.all) {
            return Err(SignalError::RateOutOfRange {
                question_id: question.to_string(),
                rate: resolved.all,
            });
        }
        evaluated += 1;
        if policy.is_disagreed(&resolved, thresholds) {
            disagreed += 1;
        }
    }

    if evaluated == 0 {
        return Ok(0.0);
    }
    Ok(disagreed as f64 / evaluated as f64)
}
