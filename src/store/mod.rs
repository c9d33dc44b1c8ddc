//! Session store — string-keyed, string-valued persistence for flow
//! progress, so a reload resumes mid-flow.

use async_trait::async_trait;

use crate::error::StoreError;

pub mod libsql_backend;
pub mod memory;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;

/// Storage keys for flow progress. The flow controller is the sole writer
/// for these.
pub mod keys {
    /// Current conversation stage.
    pub const STAGE: &str = "conversationStage";
    /// The user's free-text problem statement.
    pub const INITIAL_PROBLEM: &str = "initialProblem";
    /// Serialized problem AnswerSet.
    pub const PROBLEM_ANSWERS: &str = "problemAnswers";
    /// Serialized firmographic AnswerSet.
    pub const FIRMOGRAPHIC_ANSWERS: &str = "firmographicAnswers";
    /// Serialized generated problem question list. The firmographic list is
    /// deliberately not stored; it is canonical and re-fetched on resume.
    pub const PROBLEM_QUESTIONS: &str = "problemQuestions";
    /// Whether an authenticated identity was confirmed this session.
    pub const AUTHENTICATED: &str = "authenticated";
}

/// Key-value persistence for the conversation session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write several keys as one atomic batch, so a later failure never
    /// loses a field committed in the same logical transition.
    async fn put_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Drop all stored keys (explicit "start a new project" navigation).
    async fn clear(&self) -> Result<(), StoreError>;
}
