//! Intake Flow — conversational lead-qualification core.

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod llm;
pub mod question;
pub mod routes;
pub mod store;
