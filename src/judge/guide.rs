// src/judge/guide.rs
//! Discussion guide: which questions are open-ended, what the participant saw before them,
//! and which of a participant's authored thoughts answer them.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::ingest::tables::RawTable;
use crate::ingest::types::AuthorshipRecord;

pub const COL_ITEM_TYPE: &str = "Item type (dropdown)";
pub const COL_SECTION: &str = "Section";
const MERGE_TAG_COLUMNS: &[&str] = &[
    "Cross Conversation Tag - Polls and Opinions only (Optional)",
    "Cross Conversation Tag",
    "Tag",
];
const CONTENT_COLUMNS: &[&str] = &["Content", "Question", "Text"];
const EVALUATABLE_TYPES: &[&str] = &["ask opinion", "ask experience"];
const CONTEXT_TYPES: &[&str] = &["speak", "poll single select", "poll multi select"];

/// Minimum question length (chars) for word-overlap matching.
const PARTIAL_MATCH_MIN_CHARS: usize = 20;
const PARTIAL_MATCH_MIN_OVERLAP: f64 = 0.70;

#[derive(Debug, Clone, PartialEq)]
pub struct GuideItem {
    pub item_type: String,
    pub content: Option<String>,
    pub merge_tag: Option<String>,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatableQuestion {
    pub merge_tag: String,
    pub content: String,
    pub item_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    pub item_type: String,
    pub content: String,
}

/// Background shown before a question, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionContext {
    pub section: String,
    pub items: Vec<ContextItem>,
}

/// One answer to an evaluatable question, ready for the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeResponse {
    pub question_id: String,
    pub question: String,
    pub question_type: String,
    pub response: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionGuide {
    items: Vec<GuideItem>,
    questions: Vec<EvaluatableQuestion>,
}

fn first_present(raw: &RawTable, row: &csv::StringRecord, cols: &[&str]) -> Option<String> {
    cols.iter()
        .filter_map(|c| raw.column(c))
        .find_map(|i| row.get(i).map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

impl DiscussionGuide {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_raw(&RawTable::from_path("discussion_guide", path)?))
    }

    pub fn from_raw(raw: &RawTable) -> Self {
        // Without the item-type column, use whichever column carries the question types.
        let type_col = raw.column(COL_ITEM_TYPE).or_else(|| {
            (0..raw.headers.len()).find(|&i| {
                raw.rows.iter().any(|row| {
                    let v = row.get(i).unwrap_or("").trim().to_ascii_lowercase();
                    EVALUATABLE_TYPES.iter().any(|t| v.contains(t))
                })
            })
        });
        let section_col = raw.column(COL_SECTION);

        let items: Vec<GuideItem> = raw
            .rows
            .iter()
            .map(|row| GuideItem {
                item_type: type_col
                    .and_then(|i| row.get(i))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
                content: first_present(raw, row, CONTENT_COLUMNS),
                merge_tag: first_present(raw, row, MERGE_TAG_COLUMNS),
                section: section_col
                    .and_then(|i| row.get(i))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
            })
            .collect();

        let mut seen = HashSet::new();
        let questions = items
            .iter()
            .filter(|it| {
                EVALUATABLE_TYPES
                    .iter()
                    .any(|t| it.item_type.eq_ignore_ascii_case(t))
            })
            .filter_map(|it| {
                let tag = it.merge_tag.clone()?;
                let content = it.content.clone()?;
                seen.insert(tag.clone()).then(|| EvaluatableQuestion {
                    merge_tag: tag,
                    content,
                    item_type: it.item_type.to_ascii_lowercase(),
                })
            })
            .collect();

        Self { items, questions }
    }

    pub fn questions(&self) -> &[EvaluatableQuestion] {
        &self.questions
    }

    pub fn question(&self, merge_tag: &str) -> Option<&EvaluatableQuestion> {
        self.questions.iter().find(|q| q.merge_tag == merge_tag)
    }

    /// Speak/poll items preceding the question within its section.
    pub fn context_for(&self, merge_tag: &str) -> Option<QuestionContext> {
        self.question(merge_tag)?;
        let pos = self
            .items
            .iter()
            .position(|it| it.merge_tag.as_deref() == Some(merge_tag))?;
        let section = self.items[pos].section.clone();

        let mut items: Vec<ContextItem> = self.items[..pos]
            .iter()
            .rev()
            .take_while(|it| it.section == section || it.section.is_empty())
            .filter(|it| {
                CONTEXT_TYPES
                    .iter()
                    .any(|t| it.item_type.eq_ignore_ascii_case(t))
            })
            .filter_map(|it| {
                it.content.as_ref().map(|c| ContextItem {
                    item_type: it.item_type.to_ascii_lowercase(),
                    content: c.clone(),
                })
            })
            .collect();
        items.reverse();
        Some(QuestionContext { section, items })
    }

    /// Match authored thoughts to evaluatable questions: by question id, then exact question
    /// text (case-insensitive), then word overlap for longer questions.
    pub fn evaluatable_responses(&self, authored: &[&AuthorshipRecord]) -> Vec<JudgeResponse> {
        authored
            .iter()
            .filter_map(|rec| {
                let text = rec.thought_text.as_deref().map(str::trim)?;
                if text.is_empty() {
                    return None;
                }
                let q = self.match_question(rec)?;
                Some(JudgeResponse {
                    question_id: q.merge_tag.clone(),
                    question: q.content.clone(),
                    question_type: q.item_type.clone(),
                    response: text.to_string(),
                })
            })
            .collect()
    }

    fn match_question(&self, rec: &AuthorshipRecord) -> Option<&EvaluatableQuestion> {
        if let Some(q) = self.question(&rec.question_id) {
            return Some(q);
        }
        let asked = rec.question_text.as_deref()?.trim().to_lowercase();
        if asked.is_empty() {
            return None;
        }
        if let Some(q) = self
            .questions
            .iter()
            .find(|q| q.content.trim().to_lowercase() == asked)
        {
            return Some(q);
        }
        let asked_words: HashSet<&str> = asked.split_whitespace().collect();
        self.questions.iter().find(|q| {
            let content = q.content.trim().to_lowercase();
            if content.chars().count() <= PARTIAL_MATCH_MIN_CHARS {
                return false;
            }
            let words: HashSet<&str> = content.split_whitespace().collect();
            if words.is_empty() {
                return false;
            }
            let shared = words.intersection(&asked_words).count();
            shared as f64 / words.len() as f64 >= PARTIAL_MATCH_MIN_OVERLAP
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE: &str = "\
Section,Item type (dropdown),Content,Cross Conversation Tag - Polls and Opinions only (Optional)
Intro,speak,Welcome to the dialogue,
Intro,ask opinion,What do you hope AI will do for you?,hope_q
Work,speak,Let's talk about work,
Work,poll single select,Do you use AI at work?,
Work,speak,,
Work,ask experience,Describe a time AI helped you at work,work_q
Work,ask opinion,No tag here,
";

    fn guide() -> DiscussionGuide {
        DiscussionGuide::from_raw(&RawTable::from_reader("discussion_guide", GUIDE.as_bytes()).unwrap())
    }

    fn auth(q: &str, qtext: Option<&str>, text: Option<&str>) -> AuthorshipRecord {
        AuthorshipRecord {
            question_id: q.into(),
            participant_id: "p".into(),
            thought_id: format!("t-{q}"),
            thought_text: text.map(Into::into),
            question_text: qtext.map(Into::into),
        }
    }

    #[test]
    fn evaluatable_questions_need_tag_and_content() {
        let g = guide();
        let tags: Vec<&str> = g.questions().iter().map(|q| q.merge_tag.as_str()).collect();
        assert_eq!(tags, vec!["hope_q", "work_q"]);
        assert_eq!(g.question("work_q").unwrap().item_type, "ask experience");
    }

    #[test]
    fn context_is_same_section_in_order() {
        let g = guide();
        let ctx = g.context_for("work_q").unwrap();
        assert_eq!(ctx.section, "Work");
        let contents: Vec<&str> = ctx.items.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Let's talk about work", "Do you use AI at work?"]);
        assert_eq!(ctx.items[1].item_type, "poll single select");

        let ctx = g.context_for("hope_q").unwrap();
        assert_eq!(ctx.items.len(), 1);
        assert!(g.context_for("missing").is_none());
    }

    #[test]
    fn responses_match_by_id_text_and_overlap() {
        let g = guide();
        let rows = vec![
            auth("hope_q", None, Some("  More free time  ")),
            auth("uuid-1", Some("DESCRIBE A TIME AI HELPED YOU AT WORK"), Some("It wrote a report")),
            auth("uuid-2", Some("Please describe a time AI helped you at work today"), Some("Drafting")),
            auth("uuid-3", Some("Something unrelated entirely"), Some("x")),
            auth("work_q", None, Some("   ")),
            auth("hope_q", None, None),
        ];
        let refs: Vec<&AuthorshipRecord> = rows.iter().collect();
        let out = g.evaluatable_responses(&refs);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].response, "More free time");
        assert_eq!(out[1].question_id, "work_q");
        assert_eq!(out[2].question_id, "work_q");
    }
}
