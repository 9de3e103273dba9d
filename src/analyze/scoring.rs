//! Normalized columns → weighted composite score and 1–5 scale.
//!
//! Composite = Σ wᵢ·xᵢ over the selected weight vector. When some of a participant's terms are
//! undefined, `MissingTermPolicy` decides between re-scaling the remaining weights and
//! leaving the score undefined.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::analyze::batch::RawSignalRow;
use crate::analyze::normalize::{min_max_normalize, Direction};
use crate::analyze::weights::{WeightTable, WeightVector};
use crate::config::PriConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTermPolicy {
    /// Divide by the sum of weights of the defined terms.
    #[default]
    Renormalize,
    /// Any undefined weighted term makes the score undefined.
    Propagate,
}

/// Weighted combination of `[duration, low_quality, universal_disagreement, asc, judge]`.
///
/// Terms with weight 0 are ignored whether defined or not.
pub fn composite(
    terms: [Option<f64>; 5],
    weights: &WeightVector,
    policy: MissingTermPolicy,
) -> Option<f64> {
    let mut acc = 0.0;
    let mut used = 0.0;
    for (term, w) in terms.iter().zip(weights.as_array()) {
        if w <= 0.0 {
            continue;
        }
        match term {
            Some(x) => {
                acc += w * x;
                used += w;
            }
            None if policy == MissingTermPolicy::Propagate => return None,
            None => {}
        }
    }
    if used <= 0.0 {
        return None;
    }
    Some((acc / used).clamp(0.0, 1.0))
}

/// Map a [0, 1] score to the 1–5 scale.
pub fn to_scale(score: f64) -> f64 {
    score * 4.0 + 1.0
}

/// Final output row; `output` maps the fields to CSV columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub participant_id: String,
    pub duration_secs: Option<f64>,
    pub low_quality: Option<f64>,
    pub universal_disagreement: Option<f64>,
    pub asc_raw: Option<f64>,
    pub judge_raw: Option<f64>,
    /// Raw rating per judge model.
    pub judge_by_model: BTreeMap<String, f64>,
    pub duration_norm: Option<f64>,
    pub low_quality_norm: Option<f64>,
    pub universal_disagreement_norm: Option<f64>,
    pub asc_norm: Option<f64>,
    pub judge_norm: Option<f64>,
    pub pri_heuristic: Option<f64>,
    pub pri_score: Option<f64>,
    pub pri_scale: Option<f64>,
}

/// Scored table plus the dataset-wide weighting decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTable {
    pub rows: Vec<ScoredRow>,
    pub asc_available: bool,
    pub judge_available: bool,
    /// Vector used for `PRI_Score`.
    pub weights: WeightVector,
}

fn column(rows: &[RawSignalRow], f: impl Fn(&RawSignalRow) -> Option<f64>) -> Vec<Option<f64>> {
    rows.iter().map(f).collect()
}

/// Normalize every column and compute heuristic and final scores.
pub fn score_rows(rows: &[RawSignalRow], cfg: &PriConfig) -> ScoredTable {
    score_with(
        rows,
        &cfg.weights,
        cfg.policy.missing_terms,
        cfg.normalization.duration_reasonable_max_secs,
    )
}

pub fn score_with(
    rows: &[RawSignalRow],
    table: &WeightTable,
    policy: MissingTermPolicy,
    duration_cap: Option<f64>,
) -> ScoredTable {
    let duration = min_max_normalize(
        &column(rows, |r| r.duration_secs),
        Direction::HigherIsBetter,
        duration_cap,
    );
    let low_quality = min_max_normalize(
        &column(rows, |r| r.low_quality),
        Direction::LowerIsBetter,
        None,
    );
    let disagreement = min_max_normalize(
        &column(rows, |r| r.universal_disagreement),
        Direction::LowerIsBetter,
        None,
    );
    let asc = min_max_normalize(&column(rows, |r| r.asc), Direction::LowerIsBetter, None);
    let judge = min_max_normalize(&column(rows, |r| r.judge), Direction::HigherIsBetter, None);

    let asc_available = rows.iter().any(|r| r.asc.is_some());
    let judge_available = rows.iter().any(|r| r.judge.is_some());
    let heuristic_w = *table.select(asc_available, false);
    let final_w = *table.select(asc_available, judge_available);

    let scored = rows
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let terms = [duration[i], low_quality[i], disagreement[i], asc[i], judge[i]];
            let heuristic = composite(
                [terms[0], terms[1], terms[2], terms[3], None],
                &heuristic_w,
                policy,
            );
            let pri = if judge_available {
                composite(terms, &final_w, policy)
            } else {
                heuristic
            };
            ScoredRow {
                participant_id: raw.participant_id.clone(),
                duration_secs: raw.duration_secs,
                low_quality: raw.low_quality,
                universal_disagreement: raw.universal_disagreement,
                asc_raw: raw.asc,
                judge_raw: raw.judge,
                judge_by_model: raw.judge_by_model.clone(),
                duration_norm: duration[i],
                low_quality_norm: low_quality[i],
                universal_disagreement_norm: disagreement[i],
                asc_norm: asc[i],
                judge_norm: judge[i],
                pri_heuristic: heuristic,
                pri_score: pri,
                pri_scale: pri.map(to_scale),
            }
        })
        .collect();

    ScoredTable {
        rows: scored,
        asc_available,
        judge_available,
        weights: final_w,
    }
}
