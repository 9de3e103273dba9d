// src/ingest/tables.rs
//! CSV → typed tables. Each `read_*` function checks its required columns up front and fails
//! with `PriError::MissingColumn` instead of producing a placeholder table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{PriError, Result};
use crate::ingest::parse::{non_empty, parse_percentage, parse_timestamp};
use crate::ingest::types::{
    AggregateRecord, AuthorshipRecord, PreferenceRecord, TagRecord, TagTable, Vote, VoteRecord,
};

pub const COL_PARTICIPANT_ID: &str = "Participant ID";
pub const COL_THOUGHT_ID: &str = "Thought ID";
pub const COL_QUESTION_ID: &str = "Question ID";
pub const COL_VOTE: &str = "Vote";
pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_THOUGHT_TEXT: &str = "Thought Text";
pub const COL_QUESTION_TEXT: &str = "Question Text";
pub const COL_ALL_AGREEMENT: &str = "All";
pub const TAG_SLOT_PREFIX: &str = "Tag ";

/// Raw CSV with a header index.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: &'static str,
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn from_path(name: &'static str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| PriError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file).map_err(|e| match e {
            PriError::Csv { source, .. } => PriError::Csv {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_reader<R: Read>(name: &'static str, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let to_err = |source| PriError::Csv {
            path: name.into(),
            source,
        };
        let headers = rdr
            .headers()
            .map_err(to_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(to_err)?;
        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    pub fn column(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn require(&self, column: &'static str) -> Result<usize> {
        self.column(column).ok_or(PriError::MissingColumn {
            table: self.name,
            column,
        })
    }
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("").trim()
}

fn opt_cell(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| non_empty(cell(row, i)))
}

/// Votes. Rows without a participant id are dropped; they cannot belong to the universe.
pub fn read_votes(raw: &RawTable) -> Result<Vec<VoteRecord>> {
    let pid = raw.require(COL_PARTICIPANT_ID)?;
    let tid = raw.require(COL_THOUGHT_ID)?;
    let vote = raw.require(COL_VOTE)?;
    let ts = raw.require(COL_TIMESTAMP)?;
    Ok(raw
        .rows
        .iter()
        .filter(|row| !cell(row, pid).is_empty())
        .map(|row| VoteRecord {
            participant_id: cell(row, pid).to_string(),
            thought_id: cell(row, tid).to_string(),
            timestamp: parse_timestamp(cell(row, ts)),
            vote: Vote::parse(cell(row, vote)),
        })
        .collect())
}

pub fn read_preferences(raw: &RawTable) -> Result<Vec<PreferenceRecord>> {
    let pid = raw.require(COL_PARTICIPANT_ID)?;
    let ts = raw.require(COL_TIMESTAMP)?;
    Ok(raw
        .rows
        .iter()
        .filter(|row| !cell(row, pid).is_empty())
        .map(|row| PreferenceRecord {
            participant_id: cell(row, pid).to_string(),
            timestamp: parse_timestamp(cell(row, ts)),
        })
        .collect())
}

pub fn read_tags(raw: &RawTable) -> Result<TagTable> {
    let pid = raw.require(COL_PARTICIPANT_ID)?;
    let qid = raw.require(COL_QUESTION_ID)?;
    let slots: Vec<(usize, String)> = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.starts_with(TAG_SLOT_PREFIX))
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let records = raw
        .rows
        .iter()
        .filter(|row| !cell(row, pid).is_empty())
        .map(|row| TagRecord {
            participant_id: cell(row, pid).to_string(),
            question_id: cell(row, qid).to_string(),
            tags: slots
                .iter()
                .map(|(i, _)| non_empty(cell(row, *i)))
                .collect(),
        })
        .collect();

    Ok(TagTable {
        slot_names: slots.into_iter().map(|(_, h)| h).collect(),
        records,
    })
}

pub fn read_authorship(raw: &RawTable) -> Result<Vec<AuthorshipRecord>> {
    let qid = raw.require(COL_QUESTION_ID)?;
    let pid = raw.require(COL_PARTICIPANT_ID)?;
    let tid = raw.require(COL_THOUGHT_ID)?;
    let text = raw.column(COL_THOUGHT_TEXT);
    let qtext = raw.column(COL_QUESTION_TEXT);
    Ok(raw
        .rows
        .iter()
        .filter(|row| !cell(row, tid).is_empty())
        .map(|row| AuthorshipRecord {
            question_id: cell(row, qid).to_string(),
            participant_id: cell(row, pid).to_string(),
            thought_id: cell(row, tid).to_string(),
            thought_text: opt_cell(row, text),
            question_text: opt_cell(row, qtext),
        })
        .collect())
}

/// Aggregates. `major_segments` selects which segment columns are parsed; columns that are
/// not present in the file are skipped.
pub fn read_aggregates(raw: &RawTable, major_segments: &[String]) -> Result<Vec<AggregateRecord>> {
    let qid = raw.require(COL_QUESTION_ID)?;
    let all = raw.require(COL_ALL_AGREEMENT)?;
    let pid = raw.column(COL_PARTICIPANT_ID);
    let segment_cols: Vec<(usize, &String)> = major_segments
        .iter()
        .filter_map(|s| raw.column(s).map(|i| (i, s)))
        .collect();

    Ok(raw
        .rows
        .iter()
        .filter(|row| !cell(row, qid).is_empty())
        .map(|row| {
            let segment_agreement: BTreeMap<String, f64> = segment_cols
                .iter()
                .filter_map(|(i, name)| {
                    parse_percentage(cell(row, *i)).map(|v| ((*name).clone(), v))
                })
                .collect();
            AggregateRecord {
                question_id: cell(row, qid).to_string(),
                participant_id: opt_cell(row, pid),
                all_agreement: parse_percentage(cell(row, all)),
                segment_agreement,
            }
        })
        .collect())
}
