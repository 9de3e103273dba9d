// src/judge/prompt.rs
//! Prompt construction and tolerant parsing of the model's answer.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::judge::guide::{DiscussionGuide, JudgeResponse};

pub const SYSTEM_PROMPT: &str = "You are an expert survey quality assessor. Your task is to evaluate participant responses for earnestness and quality. Respond with a JSON object containing 'confidence_score' (0.0-1.0) and 'reasoning' (brief explanation).";

const INSTRUCTIONS: &str = "\
Given this participant's responses to the following open-ended questions from a global survey about AI, give an overall confidence score from 0.0 to 1.0 on how confident the survey administrators can be that the participant was being earnest in their responses.

This is a global survey across languages that involved some automated translation - therefore some grammatical errors may be present, so do not penalize incorrect grammar if there is clearly effort to communicate a coherent meaning.

Consider factors such as:
- Thoughtfulness and depth of responses
- Consistency across answers
- Evidence of genuine engagement with the questions
- Appropriate length and detail
- Coherent reasoning and personal perspective
- Relevance to the provided context and scenarios

";

const ANSWER_FORMAT: &str = "\
Please respond with ONLY a valid JSON object in this exact format (no additional text before or after):
{
    \"confidence_score\": 0.X,
    \"reasoning\": \"Brief explanation of your assessment\"
}

The confidence_score should be:
- 0.8-1.0: Highly earnest, thoughtful responses
- 0.6-0.8: Generally earnest with good engagement
- 0.4-0.6: Moderate earnestness, some concerns
- 0.2-0.4: Low earnestness, significant concerns
- 0.0-0.2: Very low earnestness, minimal effort

IMPORTANT: Return ONLY the JSON object, no explanation, no markdown formatting, no additional text.";

/// A model's assessment of one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub confidence_score: f64,
    #[serde(default)]
    pub reasoning: String,
}

fn title_case(s: &str) -> String {
    s.replace('_', " ")
        .split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_uppercase().chain(c.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// User prompt for one participant. Responses whose question has guide context come first.
pub fn build_prompt(responses: &[JudgeResponse], guide: &DiscussionGuide) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    let (with_ctx, without_ctx): (Vec<_>, Vec<_>) = responses
        .iter()
        .map(|r| (r, guide.context_for(&r.question_id)))
        .partition(|(_, ctx)| ctx.is_some());

    if !with_ctx.is_empty() {
        prompt.push_str("=== RESPONSES WITH CONTEXT ===\n\n");
        for (i, (resp, ctx)) in with_ctx.iter().enumerate() {
            let Some(ctx) = ctx else { continue };
            let _ = writeln!(prompt, "{}. SECTION: {}\n", i + 1, ctx.section);
            if !ctx.items.is_empty() {
                prompt.push_str("   BACKGROUND CONTEXT:\n");
                for (j, item) in ctx.items.iter().enumerate() {
                    let _ = writeln!(
                        prompt,
                        "   {}. [{}] {}",
                        j + 1,
                        title_case(&item.item_type),
                        item.content
                    );
                }
                prompt.push('\n');
            }
            let _ = writeln!(prompt, "   QUESTION [{}]: {}", resp.question_type, resp.question);
            let _ = writeln!(prompt, "   PARTICIPANT RESPONSE: {}\n", resp.response);
        }
    }

    if !without_ctx.is_empty() {
        prompt.push_str(if with_ctx.is_empty() {
            "=== PARTICIPANT RESPONSES ===\n\n"
        } else {
            "=== ADDITIONAL RESPONSES ===\n\n"
        });
        for (i, (resp, _)) in without_ctx.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. QUESTION [{}]: {}",
                with_ctx.len() + i + 1,
                resp.question_type,
                resp.question
            );
            let _ = writeln!(prompt, "   PARTICIPANT RESPONSE: {}\n", resp.response);
        }
    }

    prompt.push_str(ANSWER_FORMAT);
    prompt
}

static RE_EMBEDDED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\{[^}]*"confidence_score"[^}]*\}"#).unwrap());
static RE_BARE_SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["\s]*confidence_score["\s]*:?\s*([0-9.]+)"#).unwrap());

fn in_range(v: JudgeVerdict) -> Option<JudgeVerdict> {
    (v.confidence_score.is_finite() && (0.0..=1.0).contains(&v.confidence_score)).then_some(v)
}

/// Parse a model reply: strict JSON, then an embedded JSON object, then a bare
/// `confidence_score: <num>`. Scores outside [0, 1] are rejected.
pub fn parse_verdict(content: &str) -> Option<JudgeVerdict> {
    if let Ok(v) = serde_json::from_str::<JudgeVerdict>(content.trim()) {
        return in_range(v);
    }
    if let Some(m) = RE_EMBEDDED_JSON.find(content) {
        if let Ok(v) = serde_json::from_str::<JudgeVerdict>(m.as_str()) {
            return in_range(v);
        }
    }
    let score: f64 = RE_BARE_SCORE.captures(content)?.get(1)?.as_str().parse().ok()?;
    in_range(JudgeVerdict {
        confidence_score: score,
        reasoning: "Extracted from partial response".to_string(),
    })
}
