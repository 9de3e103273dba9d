// src/signals/agreement.rs
//! Lookup structures joining authorship with aggregate agreement rates.

use std::collections::{BTreeMap, HashMap};

use crate::ingest::types::{AggregateRecord, AuthorshipRecord};

/// Agreement rate resolved for one authored thought.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAgreement<'a> {
    pub question_id: &'a str,
    pub all: f64,
    /// Segment rates, only when the aggregate row belongs to the thought's author.
    pub segments: Option<&'a BTreeMap<String, f64>>,
}

/// Question-level and (question, author)-level agreement rates.
#[derive(Debug, Default)]
pub struct AgreementIndex<'a> {
    by_question: HashMap<&'a str, f64>,
    by_author: HashMap<(&'a str, &'a str), &'a AggregateRecord>,
}

impl<'a> AgreementIndex<'a> {
    /// Several aggregate rows may share a question; the question-level rate is the maximum of
    /// those inside [0, 1]. A question whose rows are all out of range keeps its first rate so
    /// that the bad value still surfaces when it is resolved.
    /// For (question, author) the first row with a defined rate wins.
    pub fn build(aggregates: &'a [AggregateRecord]) -> Self {
        let mut by_question: HashMap<&'a str, f64> = HashMap::new();
        let mut by_author: HashMap<(&'a str, &'a str), &'a AggregateRecord> = HashMap::new();
        for rec in aggregates {
            let Some(rate) = rec.all_agreement else {
                continue;
            };
            by_question
                .entry(rec.question_id.as_str())
                .and_modify(|r| {
                    if in_range(rate) && (!in_range(*r) || rate > *r) {
                        *r = rate;
                    }
                })
                .or_insert(rate);
            if let Some(author) = rec.participant_id.as_deref() {
                by_author
                    .entry((rec.question_id.as_str(), author))
                    .or_insert(rec);
            }
        }
        Self {
            by_question,
            by_author,
        }
    }

    pub fn question_rate(&self, question_id: &str) -> Option<f64> {
        self.by_question.get(question_id).copied()
    }

    /// Prefer the row written by `author` for this question, else the question-level rate.
    pub fn resolve(&self, question_id: &'a str, author: &str) -> Option<ResolvedAgreement<'a>> {
        if let Some(rec) = self.by_author.get(&(question_id, author)) {
            if let Some(all) = rec.all_agreement {
                return Some(ResolvedAgreement {
                    question_id,
                    all,
                    segments: Some(&rec.segment_agreement),
                });
            }
        }
        self.question_rate(question_id).map(|all| ResolvedAgreement {
            question_id,
            all,
            segments: None,
        })
    }
}

fn in_range(rate: f64) -> bool {
    (0.0..=1.0).contains(&rate)
}

/// Thought id → question id, first authorship row wins.
#[derive(Debug, Default)]
pub struct ThoughtQuestions<'a> {
    map: HashMap<&'a str, &'a str>,
    /// Distinct thoughts in first-appearance order.
    order: Vec<&'a str>,
}

impl<'a> ThoughtQuestions<'a> {
    pub fn build(authorship: &'a [AuthorshipRecord]) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for rec in authorship {
            if let std::collections::hash_map::Entry::Vacant(e) =
                map.entry(rec.thought_id.as_str())
            {
                e.insert(rec.question_id.as_str());
                order.push(rec.thought_id.as_str());
            }
        }
        Self { map, order }
    }

    pub fn question_of(&self, thought_id: &str) -> Option<&'a str> {
        self.map.get(thought_id).copied()
    }

    /// (thought, question) pairs, deduplicated, in first-appearance order.
    pub fn pairs(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.order.iter().map(|t| (*t, self.map[t]))
    }
}
