// src/output.rs
//! CSV writers for the scored table and the unreliable-participant export.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::analyze::flagging::{identify_unreliable, FlagMethod};
use crate::analyze::scoring::ScoredRow;
use crate::error::{PriError, Result};
use crate::ingest::paths::DataPaths;
use crate::ingest::types::AuthorshipRecord;
use crate::judge::{clean_model_name, DiscussionGuide};

/// Fixed columns of the scores table, also written for an empty table.
/// One `LLM_<model>` column per judge model follows them.
pub const SCORE_HEADERS: [&str; 14] = [
    "Participant ID",
    "Duration_seconds",
    "LowQualityTag_Perc",
    "UniversalDisagreement_Perc",
    "ASC_Score_Raw",
    "LLM_Judge_Score",
    "Duration_Norm",
    "LowQualityTag_Norm",
    "UniversalDisagreement_Norm",
    "ASC_Norm",
    "LLM_Judge_Norm",
    "PRI_Score_Heuristic",
    "PRI_Score",
    "PRI_Scale_1_5",
];

/// Leading columns of an unreliable-participant export; response columns follow.
pub const EXPORT_HEADERS: [&str; 6] = [
    "Recommended_Action",
    "Identification_Method",
    "Threshold_Used",
    "Participant ID",
    "PRI_Score",
    "PRI_Scale_1_5",
];

pub const RECOMMENDED_ACTION: &str = "IGNORE";
const RESPONSE_SEPARATOR: &str = " | ";

/// Column holding one judge model's raw rating.
pub fn judge_column(model: &str) -> String {
    format!("LLM_{}", clean_model_name(model))
}

/// Empty for undefined; integral values keep a trailing `.0`.
fn cell(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.1}"),
        Some(v) => v.to_string(),
    }
}

/// Every judge model that rated at least one row, sorted.
fn judge_models(rows: &[ScoredRow]) -> Vec<&str> {
    rows.iter()
        .flat_map(|r| r.judge_by_model.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn score_record(row: &ScoredRow, models: &[&str]) -> Vec<String> {
    let mut rec = Vec::with_capacity(SCORE_HEADERS.len() + models.len());
    rec.push(row.participant_id.clone());
    rec.extend(
        [
            row.duration_secs,
            row.low_quality,
            row.universal_disagreement,
            row.asc_raw,
            row.judge_raw,
            row.duration_norm,
            row.low_quality_norm,
            row.universal_disagreement_norm,
            row.asc_norm,
            row.judge_norm,
            row.pri_heuristic,
            row.pri_score,
            row.pri_scale,
        ]
        .into_iter()
        .map(cell),
    );
    rec.extend(
        models
            .iter()
            .map(|m| cell(row.judge_by_model.get(*m).copied())),
    );
    rec
}

/// Write the scores table. Undefined values become empty cells.
pub fn write_scores<W: Write>(
    writer: W,
    rows: &[ScoredRow],
) -> std::result::Result<(), csv::Error> {
    let models = judge_models(rows);
    let mut wtr = csv::Writer::from_writer(writer);
    let header: Vec<String> = SCORE_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(models.iter().map(|m| judge_column(m)))
        .collect();
    wtr.write_record(&header)?;
    for row in rows {
        wtr.write_record(score_record(row, &models))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Open-ended answers of selected participants, one column per guide question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePivot {
    /// (question id, column label), ordered by question id.
    columns: Vec<(String, String)>,
    /// participant → question id → answers joined with ` | `
    cells: HashMap<String, HashMap<String, String>>,
}

impl ResponsePivot {
    /// Answers by `participants` to the guide's open-ended questions. A column is labeled with
    /// the question text from the verbatim map, or the question id when there is none.
    pub fn build(
        authorship: &[AuthorshipRecord],
        guide: &DiscussionGuide,
        participants: &[&str],
    ) -> Self {
        let wanted: HashSet<&str> = participants.iter().copied().collect();
        let mut labels: BTreeMap<&str, Option<&str>> = BTreeMap::new();
        let mut answers: HashMap<&str, HashMap<&str, Vec<&str>>> = HashMap::new();

        for rec in authorship {
            if !wanted.contains(rec.participant_id.as_str())
                || guide.question(&rec.question_id).is_none()
            {
                continue;
            }
            let label = labels.entry(rec.question_id.as_str()).or_insert(None);
            if label.is_none() {
                *label = rec.question_text.as_deref().filter(|t| !t.trim().is_empty());
            }
            answers
                .entry(rec.participant_id.as_str())
                .or_default()
                .entry(rec.question_id.as_str())
                .or_default()
                .push(rec.thought_text.as_deref().unwrap_or(""));
        }

        let columns = labels
            .into_iter()
            .map(|(q, label)| (q.to_string(), label.unwrap_or(q).to_string()))
            .collect();
        let cells = answers
            .into_iter()
            .map(|(pid, by_q)| {
                let joined = by_q
                    .into_iter()
                    .map(|(q, texts)| (q.to_string(), texts.join(RESPONSE_SEPARATOR)))
                    .collect();
                (pid.to_string(), joined)
            })
            .collect();
        Self { columns, cells }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|(_, label)| label.as_str())
    }

    pub fn response(&self, participant_id: &str, question_id: &str) -> Option<&str> {
        self.cells
            .get(participant_id)?
            .get(question_id)
            .map(String::as_str)
    }

    fn record<'a>(&'a self, participant_id: &'a str) -> impl Iterator<Item = String> + 'a {
        self.columns.iter().map(move |(q, _)| {
            self.response(participant_id, q)
                .unwrap_or_default()
                .to_string()
        })
    }
}

/// Write flagged rows (already in export order) with the method metadata and their answers.
pub fn write_unreliable<W: Write>(
    writer: W,
    flagged: &[ScoredRow],
    method: FlagMethod,
    pivot: &ResponsePivot,
) -> std::result::Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    let header: Vec<&str> = EXPORT_HEADERS.iter().copied().chain(pivot.labels()).collect();
    wtr.write_record(&header)?;

    let threshold = method
        .threshold()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    for row in flagged {
        let rec: Vec<String> = [
            RECOMMENDED_ACTION.to_string(),
            method.name().to_string(),
            threshold.clone(),
            row.participant_id.clone(),
            cell(row.pri_score),
            cell(row.pri_scale),
        ]
        .into_iter()
        .chain(pivot.record(&row.participant_id))
        .collect();
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

fn create_output(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PriError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::File::create(path).map_err(|source| PriError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write rows to `path`, creating parent directories.
pub fn write_scores_file(path: &Path, rows: &[ScoredRow]) -> Result<()> {
    let file = create_output(path)?;
    write_scores(file, rows).map_err(|source| PriError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_unreliable_file(
    path: &Path,
    flagged: &[ScoredRow],
    method: FlagMethod,
    pivot: &ResponsePivot,
) -> Result<()> {
    let file = create_output(path)?;
    write_unreliable(file, flagged, method, pivot).map_err(|source| PriError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Flag `rows` with each method and export every non-empty list next to the scores table.
///
/// Returns the written path per method; `None` when the method flagged nobody.
pub fn export_unreliable(
    paths: &DataPaths,
    rows: &[ScoredRow],
    authorship: &[AuthorshipRecord],
    guide: &DiscussionGuide,
    methods: &[FlagMethod],
) -> Result<Vec<(FlagMethod, Option<PathBuf>)>> {
    let mut written = Vec::with_capacity(methods.len());
    for &method in methods {
        let flagged = identify_unreliable(rows, method);
        if flagged.is_empty() {
            info!(target: "pri", method = %method.slug(), "no unreliable participants");
            written.push((method, None));
            continue;
        }
        let ids: Vec<&str> = flagged.iter().map(|r| r.participant_id.as_str()).collect();
        let pivot = ResponsePivot::build(authorship, guide, &ids);
        let path = paths.flagged_output(&method.slug());
        write_unreliable_file(&path, &flagged, method, &pivot)?;
        info!(
            target: "pri",
            method = %method.slug(),
            flagged = flagged.len(),
            questions = pivot.labels().count(),
            path = %path.display(),
            "unreliable participants written"
        );
        written.push((method, Some(path)));
    }
    Ok(written)
}
