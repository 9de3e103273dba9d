// src/signals/asc.rs
use crate::ingest::types::Vote;
use crate::signals::consensus::{ConsensusItems, ConsensusKind};
use crate::signals::ParticipantRecords;

/// Anti-social-consensus score: share of the participant's valid votes on consensus items that
/// go against the consensus.
///
/// `None` when the dataset has no consensus items or the participant has no valid vote on one.
pub fn asc_score(records: &ParticipantRecords<'_>, items: &ConsensusItems) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let (against, valid) = records
        .votes
        .iter()
        .filter_map(|v| Some((items.kind_of(&v.thought_id)?, v.vote?)))
        .fold((0usize, 0usize), |(against, valid), (kind, vote)| {
            let opposed = matches!(
                (kind, vote),
                (ConsensusKind::StrongAgree, Vote::Disagree)
                    | (ConsensusKind::StrongDisagree, Vote::Agree)
            );
            (against + usize::from(opposed), valid + 1)
        });
    (valid > 0).then(|| against as f64 / valid as f64)
}
