//! REST endpoints for question generation and identity.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::{FederatedProvider, IdentityProvider};
use crate::question::{fallback_questions, firmographic_catalog, QuestionSource};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub source: Arc<dyn QuestionSource>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[derive(Debug, Deserialize)]
struct GenerateQuestionsRequest {
    problem: String,
}

/// POST /api/conversation/generate-questions
///
/// Returns the tailored problem-discovery questions for the submitted
/// problem statement. Always answers 200 with a usable list; a failing
/// question source degrades to the deterministic fallback set.
async fn generate_questions(
    State(state): State<ApiState>,
    Json(request): Json<GenerateQuestionsRequest>,
) -> impl IntoResponse {
    let problem = request.problem.trim();
    if problem.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "A problem statement is required"})),
        )
            .into_response();
    }

    let questions = match state.source.problem_questions(problem).await {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            tracing::warn!("Question source returned an empty list, using fallback set");
            fallback_questions(problem)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Question source failed, using fallback set");
            fallback_questions(problem)
        }
    };
    Json(serde_json::json!({"questions": questions})).into_response()
}

/// GET /api/conversation/firmographic-questions
///
/// Returns the canonical firmographic question catalog.
async fn firmographic_questions(State(state): State<ApiState>) -> impl IntoResponse {
    let questions = match state.source.firmographic_questions().await {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) | Err(_) => {
            tracing::warn!("Firmographic fetch failed, using built-in catalog");
            firmographic_catalog()
        }
    };
    Json(serde_json::json!({"questions": questions}))
}

/// GET /api/auth/user
///
/// Returns the current user, or `{"user": null}` when no session exists.
/// Always 200: an absent session is a normal state, not an error.
async fn current_user(State(state): State<ApiState>) -> impl IntoResponse {
    match state.identity.current_user().await {
        Ok(user) => Json(serde_json::json!({"user": user})),
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed");
            Json(serde_json::json!({"user": null}))
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthRequest {
    provider: String,
    #[serde(default)]
    redirect_to: Option<String>,
}

/// GET /api/auth/oauth?provider=google|microsoft&redirect_to=...
///
/// Redirects to the identity service's federated authorization URL, or
/// answers 400 for an unknown provider.
async fn oauth_redirect(
    State(state): State<ApiState>,
    Query(request): Query<OAuthRequest>,
) -> impl IntoResponse {
    let Some(provider) = FederatedProvider::parse(&request.provider) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Unknown provider: {}", request.provider)
            })),
        )
            .into_response();
    };

    let redirect_to = request.redirect_to.as_deref().unwrap_or("/");
    match state.identity.federated_sign_in_url(provider, redirect_to) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, provider = %provider, "Failed to build authorization URL");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": "Identity service unavailable"})),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthCallback {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    redirect_to: Option<String>,
}

/// GET /auth/callback?access_token=...&redirect_to=...
///
/// Landing endpoint for the federated redirect: establishes the session
/// from the returned token, then redirects onward. A failed exchange
/// redirects with `?error=auth_failed` instead of erroring; no token at
/// all just redirects onward.
async fn oauth_callback(
    State(state): State<ApiState>,
    Query(callback): Query<OAuthCallback>,
) -> impl IntoResponse {
    let redirect_to = callback.redirect_to.as_deref().unwrap_or("/");

    if let Some(token) = callback.access_token.as_deref() {
        if let Err(e) = state.identity.complete_federated(token).await {
            tracing::warn!(error = %e, "Federated sign-in callback failed");
            return Redirect::temporary("/?error=auth_failed");
        }
    }
    Redirect::temporary(redirect_to)
}

/// Build the API routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/conversation/generate-questions", post(generate_questions))
        .route(
            "/api/conversation/firmographic-questions",
            get(firmographic_questions),
        )
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/oauth", get(oauth_redirect))
        .route("/auth/callback", get(oauth_callback))
        .with_state(state)
}
