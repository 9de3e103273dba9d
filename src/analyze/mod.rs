// src/analyze/mod.rs
//! Scoring pipeline entry: raw signals for the participant universe, optional judge column,
//! normalization and weighting.
//!
//! Order:
//! 1) universe from the vote table (optionally capped)
//! 2) raw signals per participant (failures become undefined rows)
//! 3) judge scores attached by participant id, when present
//! 4) normalized columns, heuristic and final score

pub mod batch;
pub mod flagging;
pub mod normalize;
pub mod scoring;
pub mod weights;

use std::collections::HashMap;

use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::config::PriConfig;
use crate::ingest::types::Dataset;
use crate::judge::JudgeScore;
use crate::metrics::{
    ensure_metrics_described, CONSENSUS_ITEMS, PARTICIPANTS_TOTAL, PARTICIPANT_FAILURES_TOTAL,
};
use crate::signals::Universe;

// Re-export convenient types.
pub use crate::analyze::batch::{compute_raw_signals, BatchOutcome, RawSignalRow, SignalContext};
pub use crate::analyze::flagging::{identify_unreliable, summarize, FlagMethod, SummaryStats};
pub use crate::analyze::normalize::{min_max_normalize, Direction};
pub use crate::analyze::scoring::{
    composite, score_rows, to_scale, MissingTermPolicy, ScoredRow, ScoredTable,
};
pub use crate::analyze::weights::{WeightTable, WeightVector};

/// Universe and raw signals for a dataset, with logging and metrics.
pub fn raw_signals(
    ds: &Dataset,
    cfg: &PriConfig,
    limit: Option<usize>,
) -> (Universe, BatchOutcome) {
    ensure_metrics_described();
    let universe = Universe::from_votes(&ds.votes).capped(limit);
    info!(target: "pri", participants = universe.len(), limit = ?limit, "computing raw signals");

    let step = (universe.len() / 10).max(1);
    let outcome = batch::compute_raw_signals_with_progress(ds, &universe, cfg, &|done, total| {
        if done % step == 0 || done == total {
            debug!(target: "pri", done, total, "participants processed");
        }
    });

    for (pid, err) in &outcome.failures {
        warn!(target: "pri", participant = %pid, error = %err, "signal calculation failed");
    }
    counter!(PARTICIPANTS_TOTAL).increment(outcome.rows.len() as u64);
    counter!(PARTICIPANT_FAILURES_TOTAL).increment(outcome.failures.len() as u64);
    gauge!(CONSENSUS_ITEMS).set(outcome.consensus_items as f64);
    if outcome.consensus_items == 0 {
        warn!(target: "pri", "no strong-consensus items; ASC is undefined for everyone");
    }
    info!(
        target: "pri",
        rows = outcome.rows.len(),
        failures = outcome.failures.len(),
        consensus_items = outcome.consensus_items,
        strong_agree = outcome.strong_agree,
        strong_disagree = outcome.strong_disagree,
        "raw signals ready"
    );
    (universe, outcome)
}

/// Fill the judge columns. Participants missing from `scores` keep an undefined judge score.
pub fn attach_judge_scores(rows: &mut [RawSignalRow], scores: &HashMap<String, JudgeScore>) {
    for row in rows.iter_mut() {
        match scores.get(&row.participant_id) {
            Some(s) => {
                row.judge = s.score;
                row.judge_by_model = s.per_model.clone();
            }
            None => {
                row.judge = None;
                row.judge_by_model.clear();
            }
        }
    }
}

/// Normalize and weight, logging the dataset-wide weighting decision.
pub fn score(rows: &[RawSignalRow], cfg: &PriConfig) -> ScoredTable {
    let table = score_rows(rows, cfg);
    info!(
        target: "pri",
        asc_available = table.asc_available,
        judge_available = table.judge_available,
        weights = ?table.weights,
        missing_terms = ?cfg.policy.missing_terms,
        "scored participants"
    );
    table
}

/// Full synchronous pipeline without the judge.
pub fn run(ds: &Dataset, cfg: &PriConfig, limit: Option<usize>) -> ScoredTable {
    let (_, outcome) = raw_signals(ds, cfg, limit);
    score(&outcome.rows, cfg)
}
