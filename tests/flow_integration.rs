//! End-to-end intake flow: real question sourcing (canned sets), a real
//! libSQL session store, and a scripted identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use intake_flow::auth::{
    AuthEvent, AuthSession, FederatedProvider, IdentityProvider, SignUpOutcome, UserIdentity,
};
use intake_flow::config::FlowConfig;
use intake_flow::error::AuthError;
use intake_flow::flow::{FlowController, Resumed, SignupFeedback, Stage};
use intake_flow::question::{FallbackQuestionSource, QuestionSource};
use intake_flow::store::{keys, LibSqlStore, SessionStore};

struct ScriptedIdentity {
    events: broadcast::Sender<AuthEvent>,
}

impl ScriptedIdentity {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self { events })
    }

    fn session(email: &str) -> AuthSession {
        AuthSession {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: None,
            user: UserIdentity {
                id: Uuid::new_v4(),
                email: email.to_string(),
                confirmed_at: None,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        let session = Self::session(email);
        let _ = self.events.send(AuthEvent::SignedIn(session.user.clone()));
        Ok(SignUpOutcome::Session(session))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthSession, AuthError> {
        let session = Self::session(email);
        let _ = self.events.send(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    fn federated_sign_in_url(
        &self,
        provider: FederatedProvider,
        _redirect_to: &str,
    ) -> Result<String, AuthError> {
        Ok(format!("https://id.invalid/authorize?provider={provider}"))
    }

    async fn complete_federated(&self, _access_token: &str) -> Result<AuthSession, AuthError> {
        Ok(Self::session("federated@example.com"))
    }

    async fn current_user(&self) -> Result<Option<UserIdentity>, AuthError> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

async fn memory_store() -> Arc<dyn SessionStore> {
    Arc::new(LibSqlStore::new_memory().await.unwrap())
}

fn controller(store: Arc<dyn SessionStore>) -> Arc<FlowController> {
    FlowController::new(
        FlowConfig::instant(),
        store,
        Arc::new(FallbackQuestionSource),
        ScriptedIdentity::new(),
    )
}

async fn answer_everything(controller: &FlowController, stage: Stage, value: &str) {
    let mut walker = match stage {
        Stage::ProblemQuestions => controller.problem_walker().await,
        Stage::FirmographicQuestions => controller.firmographic_walker().await,
        other => panic!("no walker for {other}"),
    };
    loop {
        let Some(question) = walker.current() else {
            break;
        };
        // Select questions only take a listed option.
        let response = match &question.choices {
            Some(choices) => choices[0].clone(),
            None => value.to_string(),
        };
        walker.answer(&response).unwrap();
    }
    let answers = walker.finish().unwrap();
    match stage {
        Stage::ProblemQuestions => controller.complete_problem_questions(answers).await.unwrap(),
        _ => controller
            .complete_firmographic_questions(answers)
            .await
            .unwrap(),
    }
}

#[tokio::test]
async fn full_intake_survives_a_reload_at_every_stage() {
    let store = memory_store().await;

    // Entry and problem discovery.
    let first = controller(store.clone());
    first.begin("our sales CRM is a mess").await;
    assert_eq!(first.stage().await, Stage::ProblemQuestions);
    answer_everything(&first, Stage::ProblemQuestions, "answered").await;
    assert_eq!(first.stage().await, Stage::Signup);
    drop(first);

    // Reload mid-signup: no session exists, so the credential form stays.
    let second = controller(store.clone());
    assert_eq!(second.resume().await, Resumed::Active);
    assert_eq!(second.stage().await, Stage::Signup);

    // Questions generated before the reload are still there.
    let walker = second.problem_walker().await;
    let (_, total) = walker.position();
    assert!(total > 0);

    assert_eq!(
        second.sign_up("buyer@example.com", "hunter22").await.unwrap(),
        SignupFeedback::Authenticated
    );
    assert_eq!(second.stage().await, Stage::FirmographicQuestions);
    answer_everything(&second, Stage::FirmographicQuestions, "42").await;
    assert_eq!(second.stage().await, Stage::Summary);
    drop(second);

    // Reload at the summary: the firmographic list is refetched, not read
    // back from the store.
    assert!(store.get(keys::STAGE).await.unwrap().is_some());
    let third = controller(store.clone());
    assert_eq!(third.resume().await, Resumed::Active);
    assert_eq!(third.stage().await, Stage::Summary);

    let summary = third.summary().await.unwrap();
    assert_eq!(summary.problem, "our sales CRM is a mess");
    // team_size is asked in both sets; the firmographic answer wins.
    assert_eq!(summary.answers.get("team_size"), Some("42"));
    assert_eq!(summary.answers.get("sales_process"), Some("answered"));
}

#[tokio::test]
async fn firmographic_list_is_never_written_to_the_store() {
    let store = memory_store().await;
    let flow = controller(store.clone());
    flow.begin("helpdesk chaos").await;
    answer_everything(&flow, Stage::ProblemQuestions, "x").await;
    flow.sign_up("a@b.co", "hunter22").await.unwrap();
    assert_eq!(flow.stage().await, Stage::FirmographicQuestions);

    assert!(store.get(keys::PROBLEM_QUESTIONS).await.unwrap().is_some());
    assert!(store.get("firmographicQuestions").await.unwrap().is_none());
}

#[tokio::test]
async fn abandoning_resets_to_the_entry_surface() {
    let store = memory_store().await;
    let flow = controller(store.clone());
    flow.begin("helpdesk chaos").await;
    flow.abandon().await;
    drop(flow);

    let fresh = controller(store);
    assert_eq!(fresh.resume().await, Resumed::RedirectToEntry);
}

#[tokio::test]
async fn api_surface_serves_questions_and_identity() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use intake_flow::routes::{api_routes, ApiState};
    use tower::ServiceExt;

    let app = api_routes(ApiState {
        source: Arc::new(FallbackQuestionSource) as Arc<dyn QuestionSource>,
        identity: ScriptedIdentity::new(),
    });

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/conversation/generate-questions")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"problem": "support tickets pile up"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|q| q["id"] == "volume_trend"));

    let response = app
        .oneshot(
            Request::get("/api/auth/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
