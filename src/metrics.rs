// src/metrics.rs
//! Metric names and one-time descriptions. No recorder is installed here; an embedding
//! application may install one before calling into the pipeline.

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

pub const PARTICIPANTS_TOTAL: &str = "pri_participants_total";
pub const PARTICIPANT_FAILURES_TOTAL: &str = "pri_participant_failures_total";
pub const CONSENSUS_ITEMS: &str = "pri_consensus_items";
pub const JUDGE_REQUESTS_TOTAL: &str = "pri_judge_requests_total";
pub const JUDGE_FAILURES_TOTAL: &str = "pri_judge_failures_total";

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(PARTICIPANTS_TOTAL, "Participants scored.");
        describe_counter!(
            PARTICIPANT_FAILURES_TOTAL,
            "Participants whose signals failed and were emitted as undefined rows."
        );
        describe_gauge!(
            CONSENSUS_ITEMS,
            "Strong-consensus items found in the last run."
        );
        describe_counter!(JUDGE_REQUESTS_TOTAL, "LLM judge requests sent (cache misses).");
        describe_counter!(
            JUDGE_FAILURES_TOTAL,
            "LLM judge requests that failed or returned no usable score."
        );
    });
}
