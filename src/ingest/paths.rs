// src/ingest/paths.rs
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "PRI_DATA_DIR";
const DEFAULT_DATA_ROOT: &str = "Data";
const DEFAULT_OUTPUT_ROOT: &str = "analysis_output";

/// File locations for one Global Dialogue round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub round: u32,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub votes: PathBuf,
    pub preferences: PathBuf,
    pub tags: PathBuf,
    pub authorship: PathBuf,
    pub aggregates: PathBuf,
    pub segment_counts: PathBuf,
    pub discussion_guide: PathBuf,
}

impl DataPaths {
    /// Layout under `$PRI_DATA_DIR` (default `Data/`): `GD<n>/GD<n>_binary.csv`, ...
    pub fn for_round(round: u32) -> Self {
        let root = std::env::var(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_ROOT));
        Self::with_roots(round, &root.join(format!("GD{round}")), Path::new(DEFAULT_OUTPUT_ROOT))
    }

    /// Explicit round directory and output root (output goes to `<root>/GD<n>/pri`).
    pub fn with_roots(round: u32, data_dir: &Path, output_root: &Path) -> Self {
        let f = |suffix: &str| data_dir.join(format!("GD{round}_{suffix}"));
        Self {
            round,
            data_dir: data_dir.to_path_buf(),
            output_dir: output_root.join(format!("GD{round}")).join("pri"),
            votes: f("binary.csv"),
            preferences: f("preference.csv"),
            tags: data_dir.join("tags").join("all_thought_labels.csv"),
            authorship: f("verbatim_map.csv"),
            aggregates: f("aggregate_standardized.csv"),
            segment_counts: f("segment_counts_by_question.csv"),
            discussion_guide: f("discussion_guide.csv"),
        }
    }

    pub fn scores_output(&self) -> PathBuf {
        self.output_dir.join(format!("GD{}_pri_scores.csv", self.round))
    }

    pub fn flagged_output(&self, method_slug: &str) -> PathBuf {
        self.output_dir.join(format!(
            "GD{}_unreliable_participants_{method_slug}.csv",
            self.round
        ))
    }
}
