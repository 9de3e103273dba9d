// src/signals/consensus.rs
//! Strong-consensus items: responses whose question-level agreement rate is extreme.

use std::collections::HashMap;

use crate::signals::agreement::{AgreementIndex, ThoughtQuestions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusKind {
    StrongAgree,
    StrongDisagree,
}

/// `rate >= high` → strong agree, `rate <= low` → strong disagree, otherwise neither.
///
/// Rates outside [0, 1] and NaN are treated as unresolved.
pub fn classify_rate(rate: f64, high: f64, low: f64) -> Option<ConsensusKind> {
    if !(0.0..=1.0).contains(&rate) {
        return None;
    }
    if rate >= high {
        Some(ConsensusKind::StrongAgree)
    } else if rate <= low {
        Some(ConsensusKind::StrongDisagree)
    } else {
        None
    }
}

/// Classified thoughts for the whole dataset. Computed once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsensusItems {
    kinds: HashMap<String, ConsensusKind>,
}

impl ConsensusItems {
    pub fn classify(
        thoughts: &ThoughtQuestions<'_>,
        agreement: &AgreementIndex<'_>,
        high: f64,
        low: f64,
    ) -> Self {
        let kinds = thoughts
            .pairs()
            .filter_map(|(thought, question)| {
                let rate = agreement.question_rate(question)?;
                classify_rate(rate, high, low).map(|k| (thought.to_string(), k))
            })
            .collect();
        Self { kinds }
    }

    pub fn kind_of(&self, thought_id: &str) -> Option<ConsensusKind> {
        self.kinds.get(thought_id).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn strong_agree(&self) -> usize {
        self.count(ConsensusKind::StrongAgree)
    }

    pub fn strong_disagree(&self) -> usize {
        self.count(ConsensusKind::StrongDisagree)
    }

    fn count(&self, kind: ConsensusKind) -> usize {
        self.kinds.values().filter(|k| **k == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{AggregateRecord, AuthorshipRecord};
    use std::collections::BTreeMap;

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(classify_rate(0.80, 0.80, 0.20), Some(ConsensusKind::StrongAgree));
        assert_eq!(classify_rate(0.20, 0.80, 0.20), Some(ConsensusKind::StrongDisagree));
        assert_eq!(classify_rate(0.50, 0.80, 0.20), None);
        assert_eq!(classify_rate(0.7999, 0.80, 0.20), None);
        assert_eq!(classify_rate(1.0, 0.80, 0.20), Some(ConsensusKind::StrongAgree));
        assert_eq!(classify_rate(0.0, 0.80, 0.20), Some(ConsensusKind::StrongDisagree));
    }

    #[test]
    fn out_of_range_rates_are_unresolved() {
        assert_eq!(classify_rate(1.2, 0.80, 0.20), None);
        assert_eq!(classify_rate(-0.1, 0.80, 0.20), None);
        assert_eq!(classify_rate(f64::NAN, 0.80, 0.20), None);
    }

    #[test]
    fn classify_dataset() {
        let authorship: Vec<AuthorshipRecord> = [("q1", "t1"), ("q2", "t2"), ("q3", "t3"), ("q9", "t4")]
            .iter()
            .map(|(q, t)| AuthorshipRecord {
                question_id: (*q).into(),
                participant_id: "a".into(),
                thought_id: (*t).into(),
                thought_text: None,
                question_text: None,
            })
            .collect();
        let aggregates: Vec<AggregateRecord> = [("q1", 0.9), ("q2", 0.5), ("q3", 0.1)]
            .iter()
            .map(|(q, r)| AggregateRecord {
                question_id: (*q).into(),
                participant_id: None,
                all_agreement: Some(*r),
                segment_agreement: BTreeMap::new(),
            })
            .collect();
        let tq = ThoughtQuestions::build(&authorship);
        let idx = AgreementIndex::build(&aggregates);
        let items = ConsensusItems::classify(&tq, &idx, 0.8, 0.2);
        assert_eq!(items.len(), 2);
        assert_eq!(items.kind_of("t1"), Some(ConsensusKind::StrongAgree));
        assert_eq!(items.kind_of("t2"), None);
        assert_eq!(items.kind_of("t3"), Some(ConsensusKind::StrongDisagree));
        assert_eq!(items.kind_of("t4"), None);
        assert_eq!((items.strong_agree(), items.strong_disagree()), (1, 1));
    }
}
