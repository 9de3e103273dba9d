//! Column-wise min-max normalization that preserves missingness.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    /// Rescaled values are inverted (`1 - x`) so that 1.0 is always best.
    LowerIsBetter,
}

/// Median of the given values; `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Rescale one column to [0, 1].
///
/// * all-undefined column → all `None`
/// * bounds are taken after filling gaps with the column median
/// * `min == max` → 0.5 for every defined position
/// * `cap` (durations): when `max > cap`, values above the cap map to 1.0 and the rest are
///   scaled over `[min, cap]`; a cap at the column minimum leaves those values at 0.0
/// * positions undefined on input stay undefined
pub fn min_max_normalize(
    values: &[Option<f64>],
    direction: Direction,
    cap: Option<f64>,
) -> Vec<Option<f64>> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    let Some(fill) = median(&defined) else {
        return vec![None; values.len()];
    };

    let (min, max) = values
        .iter()
        .map(|v| v.unwrap_or(fill))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let cap = cap.filter(|c| max > *c);

    values
        .iter()
        .map(|v| {
            let v = (*v)?;
            let scaled = if max == min {
                0.5
            } else if let Some(cap) = cap {
                if v > cap {
                    1.0
                } else if cap > min {
                    (v - min) / (cap - min)
                } else {
                    0.0
                }
            } else {
                (v - min) / (max - min)
            };
            let scaled = scaled.clamp(0.0, 1.0);
            Some(match direction {
                Direction::HigherIsBetter => scaled,
                Direction::LowerIsBetter => 1.0 - scaled,
            })
        })
        .collect()
}
