//! Question and answer data models.
//!
//! Wire field names follow the question service contract (`question`,
//! `context`, `type`, `options`); the Rust side uses domain names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The input widget a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "text")]
    FreeText,
    #[serde(rename = "number")]
    Numeric,
    #[serde(rename = "select")]
    SingleSelect,
    #[serde(rename = "yesno")]
    Boolean,
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FreeText => "text",
            Self::Numeric => "number",
            Self::SingleSelect => "select",
            Self::Boolean => "yesno",
        };
        write!(f, "{s}")
    }
}

/// A single intake question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within a question set.
    pub id: String,
    /// The conversational question text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// "Why we're asking" explanation shown on demand.
    #[serde(rename = "context")]
    pub rationale: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Present iff `kind` is `SingleSelect`.
    #[serde(rename = "options", default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    pub required: bool,
}

impl Question {
    pub fn free_text(id: &str, prompt: &str, rationale: &str, required: bool) -> Self {
        Self::new(id, prompt, rationale, QuestionKind::FreeText, None, required)
    }

    pub fn numeric(id: &str, prompt: &str, rationale: &str, required: bool) -> Self {
        Self::new(id, prompt, rationale, QuestionKind::Numeric, None, required)
    }

    pub fn boolean(id: &str, prompt: &str, rationale: &str, required: bool) -> Self {
        Self::new(id, prompt, rationale, QuestionKind::Boolean, None, required)
    }

    pub fn single_select(
        id: &str,
        prompt: &str,
        rationale: &str,
        choices: &[&str],
        required: bool,
    ) -> Self {
        Self::new(
            id,
            prompt,
            rationale,
            QuestionKind::SingleSelect,
            Some(choices.iter().map(|c| c.to_string()).collect()),
            required,
        )
    }

    fn new(
        id: &str,
        prompt: &str,
        rationale: &str,
        kind: QuestionKind,
        choices: Option<Vec<String>>,
        required: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            rationale: rationale.to_string(),
            kind,
            choices,
            required,
        }
    }

    /// Structural validity: non-empty id and prompt, choices present iff
    /// the question is a select.
    pub fn is_valid(&self) -> bool {
        if self.id.trim().is_empty() || self.prompt.trim().is_empty() {
            return false;
        }
        match self.kind {
            QuestionKind::SingleSelect => self
                .choices
                .as_ref()
                .is_some_and(|c| !c.is_empty()),
            _ => self.choices.is_none(),
        }
    }
}

/// Mapping from question id to the user's submitted answer value.
///
/// Values are stored as strings regardless of question kind. Grows
/// monotonically as the user progresses; backward navigation may overwrite
/// a prior answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(HashMap<String, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(id.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Set union of `self` and `other`; on key collision `other` wins.
    pub fn merged_with(&self, other: &AnswerSet) -> AnswerSet {
        let mut out = self.0.clone();
        for (k, v) in &other.0 {
            out.insert(k.clone(), v.clone());
        }
        AnswerSet(out)
    }
}

impl FromIterator<(String, String)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
