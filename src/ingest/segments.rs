// src/ingest/segments.rs
//! "Major" demographic segments: segments whose average participant count per question
//! reaches a minimum. Only these are used by the segment-coverage disagreement policy.

use crate::ingest::tables::RawTable;

/// Metadata and aggregate columns that are never segments.
const EXCLUDED_PREFIXES: &[&str] = &["Question ID", "Question Text", "All", "44+", "55+"];
/// Country columns are too fine-grained to count as segments.
const COUNTRY_PREFIX: &str = "O7:";

pub fn major_segments(counts: &RawTable, min_participants: f64) -> Vec<String> {
    counts
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !h.is_empty()
                && !h.starts_with(COUNTRY_PREFIX)
                && !EXCLUDED_PREFIXES.iter().any(|p| h.starts_with(p))
        })
        .filter_map(|(i, h)| {
            let values: Vec<f64> = counts
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .filter_map(|c| c.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                return None;
            }
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            (avg >= min_participants).then(|| h.clone())
        })
        .collect()
}
