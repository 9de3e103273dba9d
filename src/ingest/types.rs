// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Binary agree/disagree judgment on another participant's thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Agree,
    Disagree,
}

impl Vote {
    /// Case-insensitive parse; anything else (e.g. "Skip", "") is not a vote.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("agree") {
            Some(Vote::Agree)
        } else if s.eq_ignore_ascii_case("disagree") {
            Some(Vote::Disagree)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteRecord {
    pub participant_id: String,
    pub thought_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// `None` when the categorical vote was neither agree nor disagree.
    pub vote: Option<Vote>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRecord {
    pub participant_id: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One labeled response; `tags[i]` is the value of `TagTable::slot_names[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRecord {
    pub participant_id: String,
    pub question_id: String,
    pub tags: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTable {
    /// Column names starting with `Tag `, in file order. Empty when the dataset has none.
    pub slot_names: Vec<String>,
    pub records: Vec<TagRecord>,
}

/// Verbatim map row: who wrote which thought for which question.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorshipRecord {
    pub question_id: String,
    pub participant_id: String,
    pub thought_id: String,
    pub thought_text: Option<String>,
    pub question_text: Option<String>,
}

/// Aggregate agreement row for a question (optionally tied to the authoring participant).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub question_id: String,
    pub participant_id: Option<String>,
    /// Population-wide agreement rate in [0, 1].
    pub all_agreement: Option<f64>,
    /// Agreement per major segment; only segments with a parseable rate are present.
    pub segment_agreement: BTreeMap<String, f64>,
}

/// The five tables the scoring core consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub votes: Vec<VoteRecord>,
    pub preferences: Vec<PreferenceRecord>,
    pub tags: TagTable,
    pub authorship: Vec<AuthorshipRecord>,
    pub aggregates: Vec<AggregateRecord>,
}
