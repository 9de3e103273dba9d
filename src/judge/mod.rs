// src/judge/mod.rs
//! LLM judge: provider abstraction, verdict cache and bounded-concurrency scoring.
//!
//! Each participant's evaluatable answers become one prompt; every configured model rates the
//! prompt and the participant's judge score is the mean of the valid ratings. Individual
//! model ratings are kept for the output table. A participant with no evaluatable answers,
//! or with no usable rating, gets no judge score.

pub mod cache;
pub mod guide;
pub mod openrouter;
pub mod prompt;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::judge::JudgeConfig;
use crate::ingest::types::Dataset;
use crate::metrics::{ensure_metrics_described, JUDGE_FAILURES_TOTAL, JUDGE_REQUESTS_TOTAL};
use crate::signals::ParticipantIndex;

pub use cache::VerdictCache;
pub use guide::{DiscussionGuide, JudgeResponse};
pub use openrouter::OpenRouterProvider;
pub use prompt::{build_prompt, parse_verdict, JudgeVerdict, SYSTEM_PROMPT};

pub const ENV_JUDGE_MODE: &str = "PRI_JUDGE_MODE";
const MOCK_SCORE: f64 = 0.75;

/// One participant's judge result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeScore {
    /// Mean of `per_model`; `None` when no model produced a rating.
    pub score: Option<f64>,
    /// Valid rating per model slug.
    pub per_model: BTreeMap<String, f64>,
}

impl JudgeScore {
    fn from_ratings(per_model: BTreeMap<String, f64>) -> Self {
        let ratings: Vec<f64> = per_model.values().copied().collect();
        Self {
            score: mean(&ratings),
            per_model,
        }
    }
}

/// Model slug as a column-name fragment: `/` and `-` become `_`.
pub fn clean_model_name(model: &str) -> String {
    model.replace(['/', '-'], "_")
}

/// Chat-completion backend. Returns the raw assistant message.
#[async_trait]
pub trait JudgeProvider: Send + Sync {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> anyhow::Result<String>;
    fn name(&self) -> &'static str;
    fn enabled(&self) -> bool {
        true
    }
}

pub type DynJudgeProvider = Arc<dyn JudgeProvider>;

/// Fixed-score provider for local runs and tests.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub score: f64,
}

#[async_trait]
impl JudgeProvider for MockProvider {
    async fn complete(&self, _model: &str, _system: &str, _prompt: &str) -> anyhow::Result<String> {
        Ok(format!(
            r#"{{"confidence_score": {}, "reasoning": "mock"}}"#,
            self.score
        ))
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Used when the judge is switched off; never produces a score.
#[derive(Debug, Clone, Copy)]
pub struct DisabledProvider;

#[async_trait]
impl JudgeProvider for DisabledProvider {
    async fn complete(&self, _model: &str, _system: &str, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("LLM judge is disabled")
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
    fn enabled(&self) -> bool {
        false
    }
}

/// Factory: build a provider according to config and environment variables.
///
/// * If `PRI_JUDGE_MODE=mock`, returns a fixed-score mock.
/// * Else if `config.enabled == false`, returns the disabled provider.
/// * Else the OpenRouter provider.
pub fn build_provider(cfg: &JudgeConfig) -> anyhow::Result<DynJudgeProvider> {
    if std::env::var(ENV_JUDGE_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockProvider { score: MOCK_SCORE }));
    }
    if !cfg.enabled {
        return Ok(Arc::new(DisabledProvider));
    }
    Ok(Arc::new(OpenRouterProvider::new(cfg)?))
}

/// Scores participants with every configured model under a shared request limit.
pub struct LlmJudge {
    provider: DynJudgeProvider,
    models: Vec<String>,
    cache: Option<VerdictCache>,
    permits: Arc<Semaphore>,
}

impl LlmJudge {
    pub fn new(provider: DynJudgeProvider, cfg: &JudgeConfig) -> Self {
        Self::with_cache(provider, cfg, Some(VerdictCache::new(&cfg.cache_dir)))
    }

    /// Never reads or writes the verdict cache.
    pub fn uncached(provider: DynJudgeProvider, cfg: &JudgeConfig) -> Self {
        Self::with_cache(provider, cfg, None)
    }

    fn with_cache(
        provider: DynJudgeProvider,
        cfg: &JudgeConfig,
        cache: Option<VerdictCache>,
    ) -> Self {
        Self {
            provider,
            models: cfg.models.clone(),
            cache,
            permits: Arc::new(Semaphore::new(cfg.max_concurrent_requests.max(1))),
        }
    }

    pub fn enabled(&self) -> bool {
        self.provider.enabled() && !self.models.is_empty()
    }

    /// One model's verdict for one prompt, through the cache.
    async fn verdict(&self, model: &str, prompt: &str) -> Option<JudgeVerdict> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(model, prompt)) {
            return Some(hit);
        }

        let reply = {
            let _permit = self.permits.acquire().await.ok()?;
            counter!(JUDGE_REQUESTS_TOTAL).increment(1);
            self.provider.complete(model, SYSTEM_PROMPT, prompt).await
        };

        let verdict = match reply {
            Ok(content) => parse_verdict(&content),
            Err(e) => {
                warn!(target: "pri", model, error = %e, "judge request failed");
                None
            }
        };
        let Some(verdict) = verdict else {
            counter!(JUDGE_FAILURES_TOTAL).increment(1);
            return None;
        };
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(model, prompt, &verdict) {
                warn!(
                    target: "pri",
                    error = %e,
                    dir = %cache.dir().display(),
                    "judge cache write failed"
                );
            }
        }
        Some(verdict)
    }

    /// Judge result per participant id. Every id in `participants` gets an entry.
    pub async fn score_participants(
        self: &Arc<Self>,
        ds: &Dataset,
        participants: &[String],
        guide: &DiscussionGuide,
    ) -> HashMap<String, JudgeScore> {
        ensure_metrics_described();
        let mut out: HashMap<String, JudgeScore> = participants
            .iter()
            .map(|p| (p.clone(), JudgeScore::default()))
            .collect();
        if !self.enabled() {
            info!(target: "pri", provider = self.provider.name(), "LLM judge disabled");
            return out;
        }

        let index = ParticipantIndex::build(ds);
        let mut set = JoinSet::new();
        let mut prompts = 0usize;
        for pid in participants {
            let responses = guide.evaluatable_responses(&index.get(pid).authored);
            if responses.is_empty() {
                debug!(target: "pri", participant = %pid, "no evaluatable responses");
                continue;
            }
            prompts += 1;
            let prompt: Arc<str> = Arc::from(build_prompt(&responses, guide));
            for model in &self.models {
                let judge = Arc::clone(self);
                let prompt = Arc::clone(&prompt);
                let model = model.clone();
                let pid = pid.clone();
                set.spawn(async move {
                    let v = judge.verdict(&model, &prompt).await;
                    (pid, model, v.map(|v| v.confidence_score))
                });
            }
        }
        info!(
            target: "pri",
            provider = self.provider.name(),
            participants = participants.len(),
            prompts,
            models = self.models.len(),
            "LLM judge started"
        );

        let mut collected: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        while let Some(res) = set.join_next().await {
            match res {
                Ok((pid, model, Some(score))) => {
                    collected.entry(pid).or_default().insert(model, score);
                }
                Ok((_, _, None)) => {}
                Err(e) => warn!(target: "pri", error = %e, "judge task aborted"),
            }
        }
        for (pid, ratings) in collected {
            out.insert(pid, JudgeScore::from_ratings(ratings));
        }
        let scored = out.values().filter(|v| v.score.is_some()).count();
        info!(target: "pri", scored, "LLM judge finished");
        out
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(models: &[&str]) -> JudgeConfig {
        JudgeConfig {
            enabled: true,
            models: models.iter().map(|m| m.to_string()).collect(),
            ..JudgeConfig::default()
        }
    }

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert_eq!(mean(&[]), None);
        assert!((mean(&[0.2, 0.4]).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn model_names_become_column_fragments() {
        assert_eq!(clean_model_name("openai/gpt-4o-mini"), "openai_gpt_4o_mini");
        assert_eq!(clean_model_name("plain"), "plain");
    }

    #[tokio::test]
    async fn mock_scores_every_model() {
        use crate::ingest::tables::RawTable;
        use crate::ingest::types::AuthorshipRecord;

        let guide_csv = "Section,Item type (dropdown),Content,Cross Conversation Tag\n\
                         Intro,ask opinion,What would make you trust an AI assistant?,trust_q\n";
        let guide = DiscussionGuide::from_raw(
            &RawTable::from_reader("discussion_guide", guide_csv.as_bytes()).unwrap(),
        );
        let ds = Dataset {
            authorship: vec![AuthorshipRecord {
                question_id: "trust_q".into(),
                participant_id: "p1".into(),
                thought_id: "t1".into(),
                thought_text: Some("Being honest about what it does not know".into()),
                question_text: None,
            }],
            ..Dataset::default()
        };
        let judge = Arc::new(LlmJudge::uncached(
            Arc::new(MockProvider { score: 0.6 }),
            &cfg(&["vendor/model-a", "model-b"]),
        ));

        let out = judge
            .score_participants(&ds, &["p1".to_string(), "p2".to_string()], &guide)
            .await;
        let p1 = &out["p1"];
        assert_eq!(p1.score, Some(0.6));
        assert_eq!(
            p1.per_model.keys().map(String::as_str).collect::<Vec<_>>(),
            ["model-b", "vendor/model-a"]
        );
        assert!(p1.per_model.values().all(|v| *v == 0.6));
        assert_eq!(out["p2"], JudgeScore::default());
    }

    #[tokio::test]
    async fn disabled_provider_yields_nothing() {
        let judge = Arc::new(LlmJudge::uncached(Arc::new(DisabledProvider), &cfg(&["a"])));
        assert!(!judge.enabled());
        let out = judge
            .score_participants(
                &Dataset::default(),
                &["p1".to_string()],
                &DiscussionGuide::default(),
            )
            .await;
        assert_eq!(out.get("p1"), Some(&JudgeScore::default()));
    }
}
