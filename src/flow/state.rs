//! The flow state aggregate and its session-store mapping.

use serde::Serialize;

use crate::question::{AnswerSet, Question};
use crate::store::{keys, SessionStore};

use super::stage::Stage;

/// The single mutable aggregate of the conversation flow. Owned exclusively
/// by the `FlowController`; no other component mutates it.
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    pub stage: Stage,
    pub initial_problem: String,
    pub problem_questions: Vec<Question>,
    /// Canonical catalog, re-fetched rather than persisted. See
    /// `store::keys::PROBLEM_QUESTIONS`.
    pub firmographic_questions: Vec<Question>,
    pub problem_answers: AnswerSet,
    pub firmographic_answers: AnswerSet,
    pub authenticated: bool,
}

impl FlowState {
    /// A fresh flow for a newly submitted problem statement.
    pub fn fresh(problem: &str) -> Self {
        Self {
            initial_problem: problem.to_string(),
            ..Default::default()
        }
    }

    /// The store records for this state. One record per flow-progress key;
    /// the whole batch is written atomically on every transition.
    pub fn records(&self) -> Vec<(&'static str, String)> {
        let mut records = vec![
            (keys::STAGE, self.stage.to_string()),
            (keys::INITIAL_PROBLEM, self.initial_problem.clone()),
            (keys::AUTHENTICATED, self.authenticated.to_string()),
        ];
        if let Some(json) = json_or_warn(keys::PROBLEM_QUESTIONS, &self.problem_questions) {
            records.push((keys::PROBLEM_QUESTIONS, json));
        }
        if let Some(json) = json_or_warn(keys::PROBLEM_ANSWERS, &self.problem_answers) {
            records.push((keys::PROBLEM_ANSWERS, json));
        }
        if let Some(json) = json_or_warn(keys::FIRMOGRAPHIC_ANSWERS, &self.firmographic_answers) {
            records.push((keys::FIRMOGRAPHIC_ANSWERS, json));
        }
        records
    }

    /// Rebuild flow state from the session store.
    ///
    /// Every field degrades independently: a missing or unparsable stored
    /// value falls back to its default (logged, never an error), so corrupt
    /// persistence can only ever restart the flow, not crash it.
    pub async fn restore(store: &dyn SessionStore) -> Self {
        let mut state = Self::default();

        if let Some(raw) = read_or_warn(store, keys::STAGE).await {
            match Stage::parse(&raw) {
                Some(stage) => state.stage = stage,
                None => tracing::warn!(value = %raw, "Discarding unknown stored stage"),
            }
        }
        if let Some(problem) = read_or_warn(store, keys::INITIAL_PROBLEM).await {
            state.initial_problem = problem;
        }
        if let Some(raw) = read_or_warn(store, keys::AUTHENTICATED).await {
            state.authenticated = raw == "true";
        }
        if let Some(raw) = read_or_warn(store, keys::PROBLEM_QUESTIONS).await {
            state.problem_questions = parse_or_warn(keys::PROBLEM_QUESTIONS, &raw);
        }
        if let Some(raw) = read_or_warn(store, keys::PROBLEM_ANSWERS).await {
            state.problem_answers = parse_or_warn(keys::PROBLEM_ANSWERS, &raw);
        }
        if let Some(raw) = read_or_warn(store, keys::FIRMOGRAPHIC_ANSWERS).await {
            state.firmographic_answers = parse_or_warn(keys::FIRMOGRAPHIC_ANSWERS, &raw);
        }

        state
    }
}

fn json_or_warn<T: Serialize>(key: &str, value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to serialize flow field");
            None
        }
    }
}

async fn read_or_warn(store: &dyn SessionStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read stored flow field");
            None
        }
    }
}

fn parse_or_warn<T: serde::de::DeserializeOwned + Default>(key: &str, raw: &str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding corrupt stored flow field");
            T::default()
        }
    }
}
