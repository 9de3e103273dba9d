//! Score distribution summary and unreliable-participant flagging.

use std::cmp::Ordering;

use serde::Serialize;

use crate::analyze::scoring::ScoredRow;

/// Linear-interpolation quantile (`q` in [0, 1]) of an ascending-sorted slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sorted_scales(rows: &[ScoredRow]) -> Vec<f64> {
    let mut v: Vec<f64> = rows.iter().filter_map(|r| r.pri_scale).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; 0 for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Statistics over the defined `PRI_Scale_1_5` values. `None` when there are none.
pub fn summarize(rows: &[ScoredRow]) -> Option<SummaryStats> {
    let v = sorted_scales(rows);
    let n = v.len();
    let (&min, &max) = (v.first()?, v.last()?);
    let mean = v.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    Some(SummaryStats {
        count: n,
        mean,
        median: quantile_sorted(&v, 0.5)?,
        std_dev,
        min,
        max,
        q1: quantile_sorted(&v, 0.25)?,
        q3: quantile_sorted(&v, 0.75)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagMethod {
    /// Below `Q1 - 1.5 * IQR`.
    Outliers,
    /// At or below the given percentile (0–100).
    Percentile(f64),
    /// At or below a fixed scale value.
    Threshold(f64),
}

impl FlagMethod {
    pub const DEFAULT_PERCENTILE: f64 = 10.0;
    pub const DEFAULT_THRESHOLD: f64 = 2.5;

    pub fn name(&self) -> &'static str {
        match self {
            FlagMethod::Outliers => "outliers",
            FlagMethod::Percentile(_) => "percentile",
            FlagMethod::Threshold(_) => "threshold",
        }
    }

    /// Parameter of the method; outliers have none.
    pub fn threshold(&self) -> Option<f64> {
        match *self {
            FlagMethod::Outliers => None,
            FlagMethod::Percentile(v) | FlagMethod::Threshold(v) => Some(v),
        }
    }

    /// File-name fragment for the flagged list.
    pub fn slug(&self) -> String {
        match self {
            FlagMethod::Outliers => "outliers".to_string(),
            FlagMethod::Percentile(p) => format!("bottom{p}pct"),
            FlagMethod::Threshold(t) => format!("threshold_{t}"),
        }
    }

    /// Scale cut-off; rows compare against it with `<` (outliers) or `<=`.
    pub fn cutoff(&self, rows: &[ScoredRow]) -> Option<f64> {
        let v = sorted_scales(rows);
        match *self {
            FlagMethod::Outliers => {
                let q1 = quantile_sorted(&v, 0.25)?;
                let q3 = quantile_sorted(&v, 0.75)?;
                Some(q1 - 1.5 * (q3 - q1))
            }
            FlagMethod::Percentile(p) => quantile_sorted(&v, p / 100.0),
            FlagMethod::Threshold(t) => Some(t),
        }
    }
}

/// Rows flagged by `method`, sorted by scale ascending. Rows without a scale are never flagged.
pub fn identify_unreliable(rows: &[ScoredRow], method: FlagMethod) -> Vec<ScoredRow> {
    let Some(cutoff) = method.cutoff(rows) else {
        return Vec::new();
    };
    let mut flagged: Vec<ScoredRow> = rows
        .iter()
        .filter(|r| match (r.pri_scale, method) {
            (Some(s), FlagMethod::Outliers) => s < cutoff,
            (Some(s), _) => s <= cutoff,
            (None, _) => false,
        })
        .cloned()
        .collect();
    flagged.sort_by(|a, b| {
        a.pri_scale
            .partial_cmp(&b.pri_scale)
            .unwrap_or(Ordering::Equal)
    });
    flagged
}

/// `n` lowest and `n` highest scored participants, for logging.
pub fn extremes(rows: &[ScoredRow], n: usize) -> (Vec<&ScoredRow>, Vec<&ScoredRow>) {
    let mut scored: Vec<&ScoredRow> = rows.iter().filter(|r| r.pri_scale.is_some()).collect();
    scored.sort_by(|a, b| {
        a.pri_scale
            .partial_cmp(&b.pri_scale)
            .unwrap_or(Ordering::Equal)
    });
    let bottom = scored.iter().take(n).copied().collect();
    let top = scored.iter().rev().take(n).copied().collect();
    (bottom, top)
}
