//! LLM-backed question generation.
//!
//! `LlmQuestionSource` asks the model for 5-7 contextual discovery questions
//! about the user's stated problem. Any provider or parse failure degrades
//! to the deterministic fallback set — generation never surfaces a blocking
//! error to the flow.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::llm::LlmProvider;

use super::fallback::fallback_questions;
use super::firmographic::firmographic_catalog;
use super::model::Question;
use super::QuestionSource;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert business consultant conducting a discovery interview. Generate 5-7 conversational, contextual questions to deeply understand the user's specific problem.

Rules:
1. Questions must be directly related to THEIR specific problem (don't ask generic company demographics)
2. Ask like a consultant who actually read their input
3. Focus on: problem scope, impact, current state, what they've tried, what success looks like
4. Be conversational but professional
5. Each question should have a clear "why we're asking" explanation
6. Mix of open-ended (text) and some binary (yesno) questions
7. Keep questions focused on understanding the PROBLEM, not the company

Return a JSON array only, no prose:
[
  {
    "id": "unique_id",
    "question": "The conversational question text",
    "context": "Why we're asking this - how it helps find the right solution",
    "type": "text" | "yesno",
    "required": true | false
  }
]"#;

/// Question source that generates problem questions with an LLM and serves
/// the static firmographic catalog.
pub struct LlmQuestionSource {
    llm: Arc<dyn LlmProvider>,
}

impl LlmQuestionSource {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn generate(&self, problem: &str) -> Result<Vec<Question>, GenerationError> {
        let user = format!(
            "User's problem: \"{problem}\"\n\nGenerate 5-7 contextual questions to understand their specific situation."
        );
        let raw = self.llm.complete(GENERATION_SYSTEM_PROMPT, &user).await?;
        parse_generated_questions(&raw)
    }
}

#[async_trait]
impl QuestionSource for LlmQuestionSource {
    async fn problem_questions(&self, problem: &str) -> Result<Vec<Question>, GenerationError> {
        match self.generate(problem).await {
            Ok(questions) => Ok(questions),
            Err(e) => {
                tracing::warn!(error = %e, "Question generation failed, using fallback set");
                Ok(fallback_questions(problem))
            }
        }
    }

    async fn firmographic_questions(&self) -> Result<Vec<Question>, GenerationError> {
        Ok(firmographic_catalog())
    }
}

/// Offline question source: always serves the deterministic fallback sets.
/// Used when no LLM API key is configured.
pub struct FallbackQuestionSource;

#[async_trait]
impl QuestionSource for FallbackQuestionSource {
    async fn problem_questions(&self, problem: &str) -> Result<Vec<Question>, GenerationError> {
        Ok(fallback_questions(problem))
    }

    async fn firmographic_questions(&self) -> Result<Vec<Question>, GenerationError> {
        Ok(firmographic_catalog())
    }
}

/// Parse and validate the model's question payload.
fn parse_generated_questions(raw: &str) -> Result<Vec<Question>, GenerationError> {
    let json = extract_json_array(raw).ok_or_else(|| GenerationError::InvalidPayload {
        reason: "no JSON array in completion".to_string(),
    })?;

    let questions: Vec<Question> =
        serde_json::from_str(json).map_err(|e| GenerationError::InvalidPayload {
            reason: format!("malformed question JSON: {e}"),
        })?;

    if questions.is_empty() {
        return Err(GenerationError::InvalidPayload {
            reason: "empty question list".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for q in &questions {
        if !q.is_valid() {
            return Err(GenerationError::InvalidPayload {
                reason: format!("invalid question {:?}", q.id),
            });
        }
        if !seen.insert(q.id.clone()) {
            return Err(GenerationError::InvalidPayload {
                reason: format!("duplicate question id {:?}", q.id),
            });
        }
    }

    Ok(questions)
}

/// Extract the first top-level JSON array from model output, tolerating
/// markdown fences and surrounding prose.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
