// src/config/judge.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_JUDGE_CONFIG_PATH: &str = "config/judge.json";
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

fn default_models() -> Vec<String> {
    vec![
        "anthropic/claude-sonnet-4".to_string(),
        "openai/gpt-4o-mini".to_string(),
        "google/gemini-2.5-flash-preview".to_string(),
    ]
}
fn default_api_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_max_concurrent() -> usize {
    10
}
fn default_timeout_seconds() -> u64 {
    60
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/judge")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub enabled: bool,
    /// OpenRouter model slugs; every model scores every participant.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// "ENV" means: read from OPENROUTER_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            models: default_models(),
            api_base_url: default_api_base_url(),
            api_key: default_api_key(),
            max_concurrent_requests: default_max_concurrent(),
            timeout_seconds: default_timeout_seconds(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl JudgeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_with(path, false)
    }

    /// Load and force `enabled`, so the api key must resolve.
    pub fn load_enabled<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_with(path, true)
    }

    fn load_with<P: AsRef<Path>>(path: P, force_enabled: bool) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: JudgeConfig = serde_json::from_str(&data)?;
        cfg.enabled |= force_enabled;
        cfg.resolve_api_key()?;
        Ok(cfg.sanitized())
    }

    /// Resolve an "ENV" api key from `OPENROUTER_API_KEY`. Only required when enabled.
    pub fn resolve_api_key(&mut self) -> anyhow::Result<()> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            match env::var(ENV_OPENROUTER_API_KEY) {
                Ok(k) => self.api_key = k,
                Err(_) if self.enabled => {
                    anyhow::bail!("Missing {ENV_OPENROUTER_API_KEY} env var")
                }
                Err(_) => self.api_key.clear(),
            }
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.models.retain(|m| !m.trim().is_empty());
        if self.models.is_empty() {
            self.models = default_models();
        }
        if self.max_concurrent_requests == 0 {
            self.max_concurrent_requests = default_max_concurrent();
        }
        if self.timeout_seconds == 0 {
            self.timeout_seconds = default_timeout_seconds();
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self
    }
}
