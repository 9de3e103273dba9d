// src/signals/duration.rs
use crate::signals::ParticipantRecords;

/// Engagement span in seconds: latest minus earliest timestamp across votes and preferences.
///
/// Fewer than two known timestamps gives 0.
pub fn duration_seconds(records: &ParticipantRecords<'_>) -> f64 {
    let stamps = records
        .votes
        .iter()
        .filter_map(|v| v.timestamp)
        .chain(records.preferences.iter().filter_map(|p| p.timestamp));

    let mut count = 0usize;
    let mut bounds = None;
    for ts in stamps {
        count += 1;
        bounds = Some(match bounds {
            None => (ts, ts),
            Some((lo, hi)) => (std::cmp::min(lo, ts), std::cmp::max(hi, ts)),
        });
    }
    let Some((lo, hi)) = bounds.filter(|_| count >= 2) else {
        return 0.0;
    };
    hi.signed_duration_since(lo).num_milliseconds() as f64 / 1000.0
}
