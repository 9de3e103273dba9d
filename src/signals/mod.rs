// src/signals/mod.rs
//! Per-participant raw signals.
//!
//! Every calculator here is a pure function over one participant's pre-grouped records plus
//! shared, read-only lookup structures. Nothing in this module logs or touches the filesystem.

pub mod agreement;
pub mod asc;
pub mod consensus;
pub mod disagreement;
pub mod duration;
pub mod low_quality;

use std::collections::{HashMap, HashSet};

use crate::ingest::types::{
    AuthorshipRecord, Dataset, PreferenceRecord, TagRecord, VoteRecord,
};

pub use agreement::{AgreementIndex, ResolvedAgreement, ThoughtQuestions};
pub use asc::asc_score;
pub use consensus::{classify_rate, ConsensusItems, ConsensusKind};
pub use disagreement::{universal_disagreement_fraction, DisagreementPolicy};
pub use duration::duration_seconds;
pub use low_quality::{low_quality_fraction, UNINFORMATIVE_TAG};

/// Ordered, de-duplicated participant ids taken from the vote table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Universe {
    ids: Vec<String>,
}

impl Universe {
    /// First-appearance order of `Participant ID` in the vote table.
    pub fn from_votes(votes: &[VoteRecord]) -> Self {
        let mut seen = HashSet::with_capacity(votes.len());
        let ids = votes
            .iter()
            .filter(|v| seen.insert(v.participant_id.as_str()))
            .map(|v| v.participant_id.clone())
            .collect();
        Self { ids }
    }

    /// Keep only the first `limit` participants (no-op when `None`).
    pub fn capped(mut self, limit: Option<usize>) -> Self {
        if let Some(n) = limit {
            self.ids.truncate(n);
        }
        self
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One participant's slice of every table.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRecords<'a> {
    pub votes: Vec<&'a VoteRecord>,
    pub preferences: Vec<&'a PreferenceRecord>,
    pub tags: Vec<&'a TagRecord>,
    pub authored: Vec<&'a AuthorshipRecord>,
}

/// Records grouped by participant id, built once per run.
#[derive(Debug, Default)]
pub struct ParticipantIndex<'a> {
    by_id: HashMap<&'a str, ParticipantRecords<'a>>,
    empty: ParticipantRecords<'a>,
}

impl<'a> ParticipantIndex<'a> {
    pub fn build(ds: &'a Dataset) -> Self {
        let mut by_id: HashMap<&'a str, ParticipantRecords<'a>> = HashMap::new();
        for v in &ds.votes {
            by_id.entry(v.participant_id.as_str()).or_default().votes.push(v);
        }
        for p in &ds.preferences {
            by_id
                .entry(p.participant_id.as_str())
                .or_default()
                .preferences
                .push(p);
        }
        for t in &ds.tags.records {
            by_id.entry(t.participant_id.as_str()).or_default().tags.push(t);
        }
        for a in &ds.authorship {
            by_id
                .entry(a.participant_id.as_str())
                .or_default()
                .authored
                .push(a);
        }
        Self {
            by_id,
            empty: ParticipantRecords::default(),
        }
    }

    /// Records for `participant_id`; a participant with no rows gets an empty slice of each.
    pub fn get(&self, participant_id: &str) -> &ParticipantRecords<'a> {
        self.by_id.get(participant_id).unwrap_or(&self.empty)
    }
}
