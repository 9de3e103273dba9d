//! Error types for the PRI pipeline.
//!
//! `PriError` covers dataset-level structural failures (a run must abort before scoring).
//! `SignalError` covers a single participant's calculation; the batch orchestrator turns it
//! into an all-undefined row and keeps going.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriError {
    #[error("required table `{table}` not found at {path}")]
    MissingTable { table: &'static str, path: PathBuf },

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("table `{table}` is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PriError>;

/// Failure while computing one participant's signals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("agreement rate {rate} for question `{question_id}` is outside [0, 1]")]
    RateOutOfRange { question_id: String, rate: f64 },
}
