// src/signals/low_quality.rs
use crate::signals::ParticipantRecords;

/// The single tag category that marks a response as low quality. Matched exactly.
pub const UNINFORMATIVE_TAG: &str = "Uninformative Answer";

/// Share of the participant's labeled responses carrying the uninformative tag in any slot.
///
/// No labeled responses, or a tag table without any `Tag *` slot columns, gives 0.0.
pub fn low_quality_fraction(
    records: &ParticipantRecords<'_>,
    slot_count: usize,
) -> f64 {
    if slot_count == 0 || records.tags.is_empty() {
        return 0.0;
    }
    let flagged = records
        .tags
        .iter()
        .filter(|r| r.tags.iter().flatten().any(|t| t == UNINFORMATIVE_TAG))
        .count();
    flagged as f64 / records.tags.len() as f64
}
