// tests/pri_pipeline.rs
//
// End-to-end scoring over a small in-memory round: three voters, a handful of consensus
// items, one labeled answer each for the two active participants. Also covers the judge
// columns and the unreliable-participant export.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use participant_reliability::analyze::{self, attach_judge_scores, FlagMethod, WeightVector};
use participant_reliability::config::judge::JudgeConfig;
use participant_reliability::config::PriConfig;
use participant_reliability::ingest::tables::RawTable;
use participant_reliability::ingest::{
    AggregateRecord, AuthorshipRecord, Dataset, PreferenceRecord, TagRecord, TagTable, Vote,
    VoteRecord,
};
use participant_reliability::judge::{DiscussionGuide, JudgeScore, LlmJudge, MockProvider};
use participant_reliability::{output, DataPaths, ScoredRow};

const T0: i64 = 1_750_000_000;

fn at(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(T0 + secs, 0).single()
}

fn vote(pid: &str, thought: &str, secs: i64, v: &str) -> VoteRecord {
    VoteRecord {
        participant_id: pid.into(),
        thought_id: thought.into(),
        timestamp: at(secs),
        vote: Vote::parse(v),
    }
}

fn authored(q: &str, pid: &str, thought: &str) -> AuthorshipRecord {
    AuthorshipRecord {
        question_id: q.into(),
        participant_id: pid.into(),
        thought_id: thought.into(),
        thought_text: Some(format!("answer {thought}")),
        question_text: None,
    }
}

fn rate(q: &str, all: f64) -> AggregateRecord {
    AggregateRecord {
        question_id: q.into(),
        participant_id: None,
        all_agreement: Some(all),
        segment_agreement: BTreeMap::new(),
    }
}

fn tag(pid: &str, q: &str, label: &str) -> TagRecord {
    TagRecord {
        participant_id: pid.into(),
        question_id: q.into(),
        tags: vec![Some(label.to_string()), None],
    }
}

/// `good`: long session, votes with consensus, well-received answer, informative label.
/// `bad`: short session, votes against consensus, rejected answer, uninformative label.
/// `idle`: one skipped vote, nothing else.
fn round() -> Dataset {
    Dataset {
        votes: vec![
            vote("good", "t1", 0, "Agree"),
            vote("bad", "t1", 0, "Disagree"),
            vote("good", "t2", 300, "Disagree"),
            vote("bad", "t2", 60, "Agree"),
            vote("idle", "t-unknown", 10, "Skip"),
        ],
        preferences: vec![PreferenceRecord {
            participant_id: "good".into(),
            timestamp: at(600),
        }],
        tags: TagTable {
            slot_names: vec!["Tag 1".into(), "Tag 2".into()],
            records: vec![
                tag("good", "q4", "Insightful"),
                tag("bad", "q5", "Uninformative Answer"),
            ],
        },
        authorship: vec![
            authored("q1", "x", "t1"),
            authored("q2", "y", "t2"),
            authored("q4", "good", "t4"),
            authored("q5", "bad", "t5"),
        ],
        aggregates: vec![rate("q1", 0.9), rate("q2", 0.1), rate("q4", 0.6), rate("q5", 0.05)],
    }
}

const GUIDE: &str = "\
Section,Item type (dropdown),Content,Cross Conversation Tag
Intro,speak,Welcome to the dialogue,
Intro,ask experience,Tell us about using AI at work,q4
Intro,ask opinion,What worries you most about AI?,q5
";

fn guide() -> DiscussionGuide {
    DiscussionGuide::from_raw(&RawTable::from_reader("discussion_guide", GUIDE.as_bytes()).unwrap())
}

fn unique_tmp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "pri_pipeline_{tag}_{}_{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn row<'a>(rows: &'a [ScoredRow], pid: &str) -> &'a ScoredRow {
    rows.iter()
        .find(|r| r.participant_id == pid)
        .unwrap_or_else(|| panic!("no row for {pid}"))
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-9)
}

#[test]
fn raw_signals_per_participant() {
    let ds = round();
    let cfg = PriConfig::default();
    let (universe, outcome) = analyze::raw_signals(&ds, &cfg, None);

    assert_eq!(universe.ids(), ["good", "bad", "idle"]);
    assert!(outcome.failures.is_empty());
    // t1, t2 and t5 are strong-consensus items, t4 is not
    assert_eq!(outcome.consensus_items, 3);
    assert_eq!((outcome.strong_agree, outcome.strong_disagree), (1, 2));

    let good = &outcome.rows[0];
    assert_eq!(good.duration_secs, Some(600.0));
    assert_eq!(good.low_quality, Some(0.0));
    assert_eq!(good.universal_disagreement, Some(0.0));
    assert_eq!(good.asc, Some(0.0));

    let bad = &outcome.rows[1];
    assert_eq!(bad.duration_secs, Some(60.0));
    assert_eq!(bad.low_quality, Some(1.0));
    assert_eq!(bad.universal_disagreement, Some(1.0));
    assert_eq!(bad.asc, Some(1.0));

    let idle = &outcome.rows[2];
    assert_eq!(idle.duration_secs, Some(0.0));
    assert_eq!(idle.low_quality, Some(0.0));
    assert_eq!(idle.universal_disagreement, Some(0.0));
    assert_eq!(idle.asc, None);
}

#[test]
fn best_participant_tops_the_scale() {
    let t = analyze::run(&round(), &PriConfig::default(), None);
    assert!(t.asc_available);
    assert!(!t.judge_available);
    assert_eq!(t.weights, WeightVector::FULL);

    let good = row(&t.rows, "good");
    assert!(close(good.pri_score, 1.0));
    assert!(close(good.pri_scale, 5.0));
    assert_eq!(good.pri_heuristic, good.pri_score);

    // 0.2 * (60 / 600) and every other term at 0
    let bad = row(&t.rows, "bad");
    assert!(close(bad.pri_score, 0.02));
    assert!(close(bad.pri_scale, 1.08));
}

#[test]
fn inactive_participant_keeps_a_row() {
    let t = analyze::run(&round(), &PriConfig::default(), None);
    assert_eq!(t.rows.len(), 3);
    let idle = row(&t.rows, "idle");
    assert_eq!(idle.duration_norm, Some(0.0));
    assert_eq!(idle.low_quality_norm, Some(1.0));
    assert_eq!(idle.universal_disagreement_norm, Some(1.0));
    assert_eq!(idle.asc_raw, None);
    assert_eq!(idle.asc_norm, None);
    // renormalized over duration, low-quality and disagreement: 0.6 / 0.8
    assert!(close(idle.pri_score, 0.75));
}

#[test]
fn propagate_policy_leaves_missing_terms_undefined() {
    let mut cfg = PriConfig::default();
    cfg.policy.missing_terms = analyze::MissingTermPolicy::Propagate;
    let t = analyze::run(&round(), &cfg, None);
    assert_eq!(row(&t.rows, "idle").pri_score, None);
    assert_eq!(row(&t.rows, "idle").pri_scale, None);
    assert!(close(row(&t.rows, "good").pri_score, 1.0));
}

#[test]
fn without_consensus_items_three_term_weights_apply() {
    let mut ds = round();
    for agg in ds.aggregates.iter_mut() {
        agg.all_agreement = Some(0.5);
    }
    let t = analyze::run(&ds, &PriConfig::default(), None);
    assert!(!t.asc_available);
    assert_eq!(t.weights, WeightVector::WITHOUT_ASC);
    assert!(t.rows.iter().all(|r| r.asc_norm.is_none()));
    // nobody is universally disagreed any more, so that column is constant at 0.5
    assert_eq!(row(&t.rows, "good").universal_disagreement_norm, Some(0.5));
    assert!(close(row(&t.rows, "good").pri_score, 0.25 + 0.375 + 0.375 * 0.5));
}

#[test]
fn judge_column_switches_to_judge_weights() {
    let ds = round();
    let cfg = PriConfig::default();
    let (_, mut outcome) = analyze::raw_signals(&ds, &cfg, None);
    let judged = [("good", Some(0.9)), ("bad", Some(0.1)), ("idle", None)];
    let scores: HashMap<String, JudgeScore> = judged
        .into_iter()
        .map(|(pid, score)| {
            (
                pid.to_string(),
                JudgeScore {
                    score,
                    per_model: BTreeMap::new(),
                },
            )
        })
        .collect();
    attach_judge_scores(&mut outcome.rows, &scores);

    let t = analyze::score(&outcome.rows, &cfg);
    assert!(t.judge_available);
    assert_eq!(t.weights, WeightVector::JUDGE);

    let good = row(&t.rows, "good");
    assert_eq!(good.judge_norm, Some(1.0));
    assert!(close(good.pri_score, 1.0));
    // the heuristic column never sees the judge
    let bad = row(&t.rows, "bad");
    assert!(close(bad.pri_heuristic, 0.02));
    assert!(close(bad.pri_score, 0.2 * 0.1));
}

#[test]
fn limit_caps_the_universe_in_vote_order() {
    let t = analyze::run(&round(), &PriConfig::default(), Some(2));
    let ids: Vec<&str> = t.rows.iter().map(|r| r.participant_id.as_str()).collect();
    assert_eq!(ids, ["good", "bad"]);
}

#[test]
fn scoring_is_idempotent_and_parallel_safe() {
    let ds = round();
    let cfg = PriConfig::default();
    let first = analyze::run(&ds, &cfg, None);
    let second = analyze::run(&ds, &cfg, None);
    assert_eq!(first, second);

    let mut par = cfg.clone();
    par.run.parallel = true;
    assert_eq!(analyze::run(&ds, &par, None), first);
}

#[test]
fn out_of_range_rate_fails_only_that_participant() {
    let mut ds = round();
    ds.aggregates.push(AggregateRecord {
        question_id: "q5".into(),
        participant_id: Some("bad".into()),
        all_agreement: Some(1.7),
        segment_agreement: BTreeMap::new(),
    });
    let cfg = PriConfig::default();
    let (_, outcome) = analyze::raw_signals(&ds, &cfg, None);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "bad");

    let bad = &outcome.rows[1];
    assert_eq!(bad.participant_id, "bad");
    assert_eq!(bad.duration_secs, None);
    assert_eq!(bad.asc, None);
    assert_eq!(outcome.rows[0].duration_secs, Some(600.0));

    let t = analyze::score(&outcome.rows, &cfg);
    assert_eq!(row(&t.rows, "bad").pri_score, None);
}

#[tokio::test]
async fn mock_judge_adds_one_column_per_model() {
    let ds = round();
    let cfg = PriConfig::default();
    let (universe, mut outcome) = analyze::raw_signals(&ds, &cfg, None);

    let judge_cfg = JudgeConfig {
        enabled: true,
        models: vec!["openai/gpt-4o-mini".into(), "meta-llama/llama-3-8b".into()],
        ..JudgeConfig::default()
    };
    let judge = Arc::new(LlmJudge::uncached(
        Arc::new(MockProvider { score: 0.75 }),
        &judge_cfg,
    ));
    let scores = judge.score_participants(&ds, universe.ids(), &guide()).await;
    attach_judge_scores(&mut outcome.rows, &scores);

    let t = analyze::score(&outcome.rows, &cfg);
    assert!(t.judge_available);
    assert_eq!(t.weights, WeightVector::JUDGE);

    let mut buf = Vec::new();
    output::write_scores(&mut buf, &t.rows).unwrap();
    let mut rdr = csv::Reader::from_reader(buf.as_slice());
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(headers.len(), output::SCORE_HEADERS.len() + 2);
    assert_eq!(&headers[14], "LLM_meta_llama_llama_3_8b");
    assert_eq!(&headers[15], "LLM_openai_gpt_4o_mini");

    let recs: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    // good and bad each answered an open-ended question; idle has nothing to judge
    assert_eq!(&recs[0][0], "good");
    assert_eq!((&recs[0][14], &recs[0][15]), ("0.75", "0.75"));
    assert_eq!((&recs[1][14], &recs[1][15]), ("0.75", "0.75"));
    assert_eq!(&recs[2][0], "idle");
    assert_eq!((&recs[2][5], &recs[2][14], &recs[2][15]), ("", "", ""));
}

#[test]
fn unreliable_export_carries_method_and_answers() {
    let mut ds = round();
    for a in ds.authorship.iter_mut().filter(|a| a.question_id == "q5") {
        a.question_text = Some("What worries you most about AI?".into());
    }
    let t = analyze::run(&ds, &PriConfig::default(), None);

    let dir = unique_tmp_dir("export");
    let paths = DataPaths::with_roots(3, &dir, &dir.join("out"));
    let written = output::export_unreliable(
        &paths,
        &t.rows,
        &ds.authorship,
        &guide(),
        &[FlagMethod::Outliers, FlagMethod::Percentile(10.0)],
    )
    .unwrap();

    // scales 1.08, 4.0 and 5.0: the lower fence is negative, so no outliers and no file
    assert_eq!(written[0], (FlagMethod::Outliers, None));
    assert!(!paths.flagged_output("outliers").exists());

    let path = written[1].1.clone().unwrap();
    assert_eq!(path, paths.flagged_output("bottom10pct"));
    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        [
            "Recommended_Action",
            "Identification_Method",
            "Threshold_Used",
            "Participant ID",
            "PRI_Score",
            "PRI_Scale_1_5",
            "What worries you most about AI?",
        ]
    );

    let recs: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(recs.len(), 1);
    let bad = &recs[0];
    assert_eq!((&bad[0], &bad[1], &bad[2], &bad[3]), ("IGNORE", "percentile", "10", "bad"));
    assert!(close(bad[5].parse().ok(), 1.08));
    assert_eq!(&bad[6], "answer t5");

    let _ = fs::remove_dir_all(dir);
}
