//! Batch orchestration: one raw-signal row per participant, in universe order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::config::PriConfig;
use crate::error::SignalError;
use crate::ingest::types::Dataset;
use crate::signals::{
    asc_score, duration_seconds, low_quality_fraction, universal_disagreement_fraction,
    AgreementIndex, ConsensusItems, ParticipantIndex, ThoughtQuestions, Universe,
};

/// Raw, un-normalized signals for one participant. `None` means undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignalRow {
    pub participant_id: String,
    pub duration_secs: Option<f64>,
    pub low_quality: Option<f64>,
    pub universal_disagreement: Option<f64>,
    pub asc: Option<f64>,
    pub judge: Option<f64>,
    /// Valid judge rating per model, when the judge ran.
    pub judge_by_model: BTreeMap<String, f64>,
}

impl RawSignalRow {
    /// Row for a participant whose calculation failed: every signal undefined.
    pub fn undefined(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            duration_secs: None,
            low_quality: None,
            universal_disagreement: None,
            asc: None,
            judge: None,
            judge_by_model: BTreeMap::new(),
        }
    }
}

/// Lookup structures shared read-only by every participant's calculation.
pub struct SignalContext<'a> {
    cfg: &'a PriConfig,
    participants: ParticipantIndex<'a>,
    thoughts: ThoughtQuestions<'a>,
    agreement: AgreementIndex<'a>,
    consensus: ConsensusItems,
    tag_slots: usize,
}

impl<'a> SignalContext<'a> {
    pub fn build(ds: &'a Dataset, cfg: &'a PriConfig) -> Self {
        let thoughts = ThoughtQuestions::build(&ds.authorship);
        let agreement = AgreementIndex::build(&ds.aggregates);
        let consensus = ConsensusItems::classify(
            &thoughts,
            &agreement,
            cfg.thresholds.asc_high,
            cfg.thresholds.asc_low,
        );
        Self {
            cfg,
            participants: ParticipantIndex::build(ds),
            thoughts,
            agreement,
            consensus,
            tag_slots: ds.tags.slot_names.len(),
        }
    }

    pub fn consensus(&self) -> &ConsensusItems {
        &self.consensus
    }

    /// All four signals for one participant. The judge column is filled in later.
    pub fn compute(&self, participant_id: &str) -> Result<RawSignalRow, SignalError> {
        let records = self.participants.get(participant_id);
        let duration = duration_seconds(records);
        let low_quality = low_quality_fraction(records, self.tag_slots);
        let universal_disagreement = universal_disagreement_fraction(
            participant_id,
            records,
            &self.thoughts,
            &self.agreement,
            &self.cfg.thresholds,
            self.cfg.policy.disagreement,
        )?;
        Ok(RawSignalRow {
            participant_id: participant_id.to_string(),
            duration_secs: Some(duration),
            low_quality: Some(low_quality),
            universal_disagreement: Some(universal_disagreement),
            asc: asc_score(records, &self.consensus),
            judge: None,
            judge_by_model: BTreeMap::new(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Exactly one row per universe participant, in universe order.
    pub rows: Vec<RawSignalRow>,
    /// Participants whose row was replaced by an all-undefined one.
    pub failures: Vec<(String, SignalError)>,
    pub consensus_items: usize,
    pub strong_agree: usize,
    pub strong_disagree: usize,
}

pub fn compute_raw_signals(ds: &Dataset, universe: &Universe, cfg: &PriConfig) -> BatchOutcome {
    compute_raw_signals_with_progress(ds, universe, cfg, &|_, _| {})
}

/// Same as [`compute_raw_signals`]; `progress(done, total)` is called after each participant.
pub fn compute_raw_signals_with_progress(
    ds: &Dataset,
    universe: &Universe,
    cfg: &PriConfig,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> BatchOutcome {
    let ctx = SignalContext::build(ds, cfg);
    let total = universe.len();
    let done = AtomicUsize::new(0);

    let one = |pid: &String| {
        let result = ctx.compute(pid);
        progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
        result
    };
    let results: Vec<Result<RawSignalRow, SignalError>> = if cfg.run.parallel {
        universe.ids().par_iter().map(one).collect()
    } else {
        universe.ids().iter().map(one).collect()
    };

    let mut failures = Vec::new();
    let rows = universe
        .ids()
        .iter()
        .zip(results)
        .map(|(pid, res)| {
            res.unwrap_or_else(|e| {
                failures.push((pid.clone(), e));
                RawSignalRow::undefined(pid.as_str())
            })
        })
        .collect();

    BatchOutcome {
        rows,
        failures,
        consensus_items: ctx.consensus().len(),
        strong_agree: ctx.consensus().strong_agree(),
        strong_disagree: ctx.consensus().strong_disagree(),
    }
}
