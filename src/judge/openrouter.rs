// src/judge/openrouter.rs
//! OpenRouter chat-completions provider.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::judge::JudgeConfig;
use crate::judge::JudgeProvider;

const TITLE: &str = "Global Dialogues PRI Assessment";

pub struct OpenRouterProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(cfg: &JudgeConfig) -> anyhow::Result<Self> {
        if cfg.api_key.is_empty() {
            bail!("OpenRouter API key is empty");
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("participant-reliability/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            base_url: cfg.api_base_url.clone(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait]
impl JudgeProvider for OpenRouterProvider {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> anyhow::Result<String> {
        let req = Req {
            model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 500,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", TITLE)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("request to {model}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("HTTP {status} from {model}: {body}");
        }
        let body: Resp = resp
            .json()
            .await
            .with_context(|| format!("decoding response from {model}"))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .with_context(|| format!("empty completion from {model}"))
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
