// src/ingest/mod.rs
//! Dataset loading: five CSV tables for one survey round, validated before any scoring.
//!
//! Votes, preferences, verbatim map and aggregates are required; a missing file or column
//! aborts the run. The tag table and the segment counts are optional and degrade to empty.

pub mod parse;
pub mod paths;
pub mod segments;
pub mod tables;
pub mod types;

use std::path::Path;

use tracing::{info, warn};

use crate::config::PriConfig;
use crate::error::{PriError, Result};
use crate::ingest::paths::DataPaths;
use crate::ingest::tables::RawTable;
pub use crate::ingest::types::{
    AggregateRecord, AuthorshipRecord, Dataset, PreferenceRecord, TagRecord, TagTable, Vote,
    VoteRecord,
};

#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub major_segments: Vec<String>,
}

fn required(table: &'static str, path: &Path) -> Result<RawTable> {
    if !path.exists() {
        return Err(PriError::MissingTable {
            table,
            path: path.to_path_buf(),
        });
    }
    RawTable::from_path(table, path)
}

fn optional(table: &'static str, path: &Path) -> Option<RawTable> {
    if !path.exists() {
        warn!(target: "pri", table, path = %path.display(), "optional table not found");
        return None;
    }
    match RawTable::from_path(table, path) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(target: "pri", table, error = %e, "optional table unreadable");
            None
        }
    }
}

/// Load and validate every table for one round.
pub fn load_dataset(paths: &DataPaths, cfg: &PriConfig) -> Result<LoadedData> {
    let votes = tables::read_votes(&required("votes", &paths.votes)?)?;
    let preferences = tables::read_preferences(&required("preferences", &paths.preferences)?)?;
    let authorship = tables::read_authorship(&required("verbatim_map", &paths.authorship)?)?;

    let major_segments = optional("segment_counts", &paths.segment_counts)
        .map(|t| segments::major_segments(&t, cfg.segments.major_min_participants))
        .unwrap_or_default();
    let aggregates = tables::read_aggregates(
        &required("aggregates", &paths.aggregates)?,
        &major_segments,
    )?;

    // Labels are produced by a separate tagging step and may not exist yet for a round.
    let tags = match optional("tags", &paths.tags) {
        Some(raw) => tables::read_tags(&raw)?,
        None => TagTable::default(),
    };

    info!(
        target: "pri",
        votes = votes.len(),
        preferences = preferences.len(),
        tags = tags.records.len(),
        tag_slots = tags.slot_names.len(),
        authorship = authorship.len(),
        aggregates = aggregates.len(),
        major_segments = major_segments.len(),
        "dataset loaded"
    );

    Ok(LoadedData {
        dataset: Dataset {
            votes,
            preferences,
            tags,
            authorship,
            aggregates,
        },
        major_segments,
    })
}
