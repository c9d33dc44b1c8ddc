//! Question sourcing — data model, LLM generation, fallbacks, and the
//! static firmographic catalog.

use async_trait::async_trait;

use crate::error::GenerationError;

pub mod fallback;
pub mod firmographic;
pub mod generator;
pub mod model;

pub use fallback::fallback_questions;
pub use firmographic::firmographic_catalog;
pub use generator::{FallbackQuestionSource, LlmQuestionSource};
pub use model::{AnswerSet, Question, QuestionKind};

/// Supplies ordered question lists for the conversation flow.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Questions tailored to a free-text problem statement.
    async fn problem_questions(&self, problem: &str) -> Result<Vec<Question>, GenerationError>;

    /// The fixed post-signup company-profile questions.
    async fn firmographic_questions(&self) -> Result<Vec<Question>, GenerationError>;
}
