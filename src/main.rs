//! pri: binary entrypoint.
//! Loads one Global Dialogues round, computes the Participant Reliability Index and writes the
//! scored table plus the unreliable-participant exports (outliers, bottom 10% and any
//! method picked with --flag).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use participant_reliability::analyze::{self, flagging, FlagMethod};
use participant_reliability::config::judge::{JudgeConfig, DEFAULT_JUDGE_CONFIG_PATH};
use participant_reliability::judge::{self, DiscussionGuide, LlmJudge};
use participant_reliability::{load_dataset, output, DataPaths, PriConfig};

const ENV_LOG_FORMAT: &str = "PRI_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FlagKind {
    Outliers,
    Percentile,
    Threshold,
}

/// Command-line arguments for pri
#[derive(Parser, Debug)]
#[command(name = "pri")]
#[command(about = "Participant Reliability Index for a Global Dialogues round")]
#[command(version)]
struct Args {
    /// Global Dialogue round number
    #[arg(long, env = "PRI_GD_NUMBER")]
    gd_number: u32,

    /// Round directory containing GD<n>_*.csv (default: $PRI_DATA_DIR/GD<n> or Data/GD<n>)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory (default: analysis_output/GD<n>/pri)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// PRI TOML config (default: $PRI_CONFIG_PATH, config/pri.toml, built-in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only score the first N participants of the vote table
    #[arg(long)]
    limit: Option<usize>,

    /// Add the LLM judge score
    #[arg(long)]
    llm_judge: bool,

    /// Judge JSON config
    #[arg(long, default_value = DEFAULT_JUDGE_CONFIG_PATH)]
    judge_config: PathBuf,

    /// Compute participants on all cores
    #[arg(long)]
    parallel: bool,

    /// Extra flagging method exported next to outliers and bottom 10%
    #[arg(long, value_enum, default_value_t = FlagKind::Outliers)]
    flag: FlagKind,

    /// Percentile (0-100) or scale threshold for --flag percentile|threshold
    #[arg(long)]
    flag_value: Option<f64>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pri=info,warn"));
    let json = std::env::var(ENV_LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn flag_method(kind: FlagKind, value: Option<f64>) -> FlagMethod {
    match kind {
        FlagKind::Outliers => FlagMethod::Outliers,
        FlagKind::Percentile => {
            FlagMethod::Percentile(value.unwrap_or(FlagMethod::DEFAULT_PERCENTILE))
        }
        FlagKind::Threshold => {
            FlagMethod::Threshold(value.unwrap_or(FlagMethod::DEFAULT_THRESHOLD))
        }
    }
}

fn load_judge_config(path: &Path) -> Result<JudgeConfig> {
    let mock = std::env::var(judge::ENV_JUDGE_MODE).is_ok_and(|v| v == "mock");
    if mock {
        // the mock provider needs no api key
        let mut cfg = if path.exists() {
            JudgeConfig::load_from_file(path)
                .with_context(|| format!("loading judge config {}", path.display()))?
        } else {
            JudgeConfig::default()
        };
        cfg.enabled = true;
        return Ok(cfg);
    }
    if path.exists() {
        // --llm-judge turns the judge on regardless of the file's flag
        return JudgeConfig::load_enabled(path)
            .with_context(|| format!("loading judge config {}", path.display()));
    }
    warn!(target: "pri", path = %path.display(), "judge config not found, using defaults");
    let mut cfg = JudgeConfig {
        enabled: true,
        ..JudgeConfig::default()
    };
    cfg.resolve_api_key()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => PriConfig::load_from_file(p),
        None => PriConfig::load_default(),
    }
    .context("loading PRI config")?;
    if args.parallel {
        cfg.run.parallel = true;
    }

    let mut paths = match &args.data_dir {
        Some(dir) => DataPaths::with_roots(args.gd_number, dir, Path::new("analysis_output")),
        None => DataPaths::for_round(args.gd_number),
    };
    if let Some(out) = &args.output_dir {
        paths.output_dir = out.clone();
    }
    info!(
        target: "pri",
        round = args.gd_number,
        data_dir = %paths.data_dir.display(),
        output_dir = %paths.output_dir.display(),
        "starting PRI run"
    );

    let loaded = load_dataset(&paths, &cfg).context("loading dataset")?;
    let ds = &loaded.dataset;

    let (universe, mut batch) = analyze::raw_signals(ds, &cfg, args.limit);

    let guide = DiscussionGuide::load(&paths.discussion_guide).unwrap_or_else(|e| {
        warn!(target: "pri", error = %e, "discussion guide unavailable; no open-ended questions");
        DiscussionGuide::default()
    });
    info!(target: "pri", questions = guide.questions().len(), "discussion guide loaded");

    if args.llm_judge {
        let judge_cfg = load_judge_config(&args.judge_config)?;
        let provider = judge::build_provider(&judge_cfg)?;
        let judge = Arc::new(LlmJudge::new(provider, &judge_cfg));
        let scores = judge.score_participants(ds, universe.ids(), &guide).await;
        analyze::attach_judge_scores(&mut batch.rows, &scores);
    }

    let table = analyze::score(&batch.rows, &cfg);
    let scores_path = paths.scores_output();
    output::write_scores_file(&scores_path, &table.rows)?;
    info!(target: "pri", path = %scores_path.display(), rows = table.rows.len(), "scores written");

    match flagging::summarize(&table.rows) {
        Some(s) => info!(
            target: "pri",
            count = s.count,
            mean = s.mean,
            median = s.median,
            std_dev = s.std_dev,
            min = s.min,
            max = s.max,
            q1 = s.q1,
            q3 = s.q3,
            "PRI_Scale_1_5 summary"
        ),
        None => warn!(target: "pri", "no participant received a PRI score"),
    }
    let (bottom, top) = flagging::extremes(&table.rows, 5);
    for r in &top {
        info!(target: "pri", participant = %r.participant_id, scale = ?r.pri_scale, "top");
    }
    for r in &bottom {
        info!(target: "pri", participant = %r.participant_id, scale = ?r.pri_scale, "bottom");
    }

    let mut methods = vec![
        FlagMethod::Outliers,
        FlagMethod::Percentile(FlagMethod::DEFAULT_PERCENTILE),
    ];
    let requested = flag_method(args.flag, args.flag_value);
    if !methods.contains(&requested) {
        methods.push(requested);
    }
    output::export_unreliable(&paths, &table.rows, &ds.authorship, &guide, &methods)?;

    Ok(())
}
