// src/lib.rs
// Public library surface for the `pri` binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;

// Per-participant signal calculators and the consensus classifier
pub mod signals;

// Batch orchestration, normalization, weighting, flagging
pub mod analyze;

// Optional LLM judge (async)
pub mod judge;

pub mod output;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{RawSignalRow, ScoredRow, ScoredTable};
pub use crate::config::PriConfig;
pub use crate::error::{PriError, SignalError};
pub use crate::ingest::{load_dataset, paths::DataPaths, Dataset, LoadedData};
pub use crate::signals::Universe;
