//! Error types for intake-flow.

/// Top-level error type for the intake service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Question generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Flow controller and question walker errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Question {id} requires an answer")]
    AnswerRequired { id: String },

    #[error("Answer {value:?} is not one of the options for question {id}")]
    InvalidChoice { id: String, value: String },

    #[error("Question {id} is required and cannot be skipped")]
    SkipRequired { id: String },

    #[error("Question walk is not finished: {remaining} question(s) left")]
    WalkIncomplete { remaining: usize },
}

/// Question generation errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid question payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Identity provider errors. Messages are surfaced inline to the user,
/// so they must stay human-readable.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Could not reach the identity service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { message: String },

    #[error("Unexpected response from the identity service: {reason}")]
    InvalidResponse { reason: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open session store: {0}")]
    Open(String),

    #[error("Session store query failed: {0}")]
    Query(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
