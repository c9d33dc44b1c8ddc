//! FlowController — coordinates stages, question sourcing, auth, and
//! persistence for one intake conversation.
//!
//! All state transitions happen behind one `RwLock`ed `FlowState` and check
//! the current stage before applying, so every transition is idempotent:
//! re-applying one whose source stage has already moved on is a no-op. That
//! is what lets timer completions, identity callbacks, and stale question
//! responses race without corrupting the flow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::auth::{AuthEvent, IdentityProvider, SignUpOutcome, UserIdentity};
use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::question::{
    fallback_questions, firmographic_catalog, AnswerSet, Question, QuestionSource,
};
use crate::store::SessionStore;

use super::stage::Stage;
use super::state::FlowState;
use super::walker::QuestionWalker;

/// Result of (re)initializing a controller from the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    /// The flow is active (fresh or restored mid-flow).
    Active,
    /// No problem statement exists; the caller must send the user back to
    /// the entry surface.
    RedirectToEntry,
}

/// Feedback from a credential submission on the signup surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupFeedback {
    /// A session was established; the flow has advanced.
    Authenticated,
    /// The account needs email confirmation. The message names the
    /// submitted address and is shown inline; the stage stays at signup.
    ConfirmationPending { message: String },
}

/// The merged view rendered at the end of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub problem: String,
    /// Union of problem and firmographic answers; firmographic keys win on
    /// collision.
    pub answers: AnswerSet,
}

/// Sequences the intake conversation. Sole owner and sole mutator of
/// `FlowState`; serializes it to the session store on every transition.
pub struct FlowController {
    config: FlowConfig,
    store: Arc<dyn SessionStore>,
    source: Arc<dyn QuestionSource>,
    identity: Arc<dyn IdentityProvider>,
    state: RwLock<FlowState>,
    /// One outstanding problem-question request at a time.
    problem_fetch_pending: AtomicBool,
    auth_task: Mutex<Option<JoinHandle<()>>>,
}

impl FlowController {
    /// Build a controller and subscribe it to the identity provider's
    /// event channel. The subscription task holds only a weak reference and
    /// is aborted when the controller is dropped.
    pub fn new(
        config: FlowConfig,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn QuestionSource>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self {
            config,
            store,
            source,
            identity,
            state: RwLock::new(FlowState::default()),
            problem_fetch_pending: AtomicBool::new(false),
            auth_task: Mutex::new(None),
        });

        let handle = tokio::spawn(Self::auth_event_loop(
            Arc::downgrade(&controller),
            controller.identity.subscribe(),
        ));
        *controller.auth_task.lock().expect("auth task lock poisoned") = Some(handle);

        controller
    }

    async fn auth_event_loop(
        controller: Weak<FlowController>,
        mut events: broadcast::Receiver<AuthEvent>,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(controller) = controller.upgrade() else {
                        break;
                    };
                    match event {
                        AuthEvent::SignedIn(user) => controller.handle_signed_in(user).await,
                        AuthEvent::SignedOut => controller.handle_signed_out().await,
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Start a fresh flow for a newly submitted problem statement.
    pub async fn begin(&self, problem: &str) {
        *self.state.write().await = FlowState::fresh(problem);
        self.persist().await;
        self.load_problem_questions().await;
    }

    /// Restore flow progress from the session store.
    ///
    /// A missing or initial stored stage starts the flow fresh for the
    /// stored problem statement; no problem statement at all (whatever the
    /// stored stage claims) signals a redirect to the entry surface. A
    /// restored stage at or past the firmographic questions re-fetches the
    /// canonical firmographic catalog, which is deliberately not persisted.
    pub async fn resume(&self) -> Resumed {
        let restored = FlowState::restore(self.store.as_ref()).await;

        if restored.initial_problem.trim().is_empty() {
            return Resumed::RedirectToEntry;
        }

        if restored.stage.is_initial() {
            let problem = restored.initial_problem.clone();
            self.begin(&problem).await;
            return Resumed::Active;
        }

        let stage = restored.stage;
        *self.state.write().await = restored;

        if stage >= Stage::FirmographicQuestions {
            self.refetch_firmographic().await;
        }
        if stage == Stage::Signup {
            self.reconcile_auth().await;
        }
        // A reload during the summary loading screen restarts its timer;
        // nothing else gates the final transition.
        if stage == Stage::GeneratingSummary {
            self.finish_summary_loading().await;
        }

        Resumed::Active
    }

    /// Explicit navigation away to start a new project: clear all persisted
    /// progress and reset in-memory state.
    pub async fn abandon(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear session store");
        }
        *self.state.write().await = FlowState::default();
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub async fn stage(&self) -> Stage {
        self.state.read().await.stage
    }

    pub async fn snapshot(&self) -> FlowState {
        self.state.read().await.clone()
    }

    /// Walker over the problem questions, pre-seeded with any prior
    /// answers (populated again after the "edit answers" regression).
    pub async fn problem_walker(&self) -> QuestionWalker {
        let state = self.state.read().await;
        QuestionWalker::with_answers(state.problem_questions.clone(), state.problem_answers.clone())
    }

    /// Walker over the firmographic questions.
    pub async fn firmographic_walker(&self) -> QuestionWalker {
        let state = self.state.read().await;
        QuestionWalker::with_answers(
            state.firmographic_questions.clone(),
            state.firmographic_answers.clone(),
        )
    }

    /// The merged summary, once the flow has reached it.
    pub async fn summary(&self) -> Option<Summary> {
        let state = self.state.read().await;
        if state.stage != Stage::Summary {
            return None;
        }
        Some(Summary {
            problem: state.initial_problem.clone(),
            answers: state.problem_answers.merged_with(&state.firmographic_answers),
        })
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// All required problem answers collected; capture them and move to
    /// signup. Auto-advances past signup when already authenticated.
    pub async fn complete_problem_questions(
        &self,
        answers: AnswerSet,
    ) -> Result<(), FlowError> {
        {
            let mut state = self.state.write().await;
            match state.stage {
                Stage::ProblemQuestions => {
                    state.problem_answers = answers;
                    state.stage = Stage::Signup;
                }
                s if s > Stage::ProblemQuestions => return Ok(()),
                s => {
                    return Err(FlowError::InvalidTransition {
                        from: s.to_string(),
                        to: Stage::Signup.to_string(),
                    })
                }
            }
        }
        self.persist().await;
        self.reconcile_auth().await;
        Ok(())
    }

    /// All required firmographic answers collected; capture them, hold the
    /// summary loading screen for its minimum duration, then show the
    /// summary. Nothing external gates the final transition.
    pub async fn complete_firmographic_questions(
        &self,
        answers: AnswerSet,
    ) -> Result<(), FlowError> {
        {
            let mut state = self.state.write().await;
            match state.stage {
                Stage::FirmographicQuestions => {
                    state.firmographic_answers = answers;
                    state.stage = Stage::GeneratingSummary;
                }
                s if s > Stage::FirmographicQuestions => return Ok(()),
                s => {
                    return Err(FlowError::InvalidTransition {
                        from: s.to_string(),
                        to: Stage::GeneratingSummary.to_string(),
                    })
                }
            }
        }
        self.persist().await;
        self.finish_summary_loading().await;
        Ok(())
    }

    /// Hold the summary loading screen for its minimum duration, then show
    /// the summary.
    async fn finish_summary_loading(&self) {
        sleep(self.config.summary_loading_min).await;
        {
            let mut state = self.state.write().await;
            if state.stage == Stage::GeneratingSummary {
                state.stage = Stage::Summary;
            }
        }
        self.persist().await;
    }

    /// User-initiated regression from the summary back to the problem
    /// questions. Collected answers are kept and pre-populate the walker.
    pub async fn edit_answers(&self) -> Result<(), FlowError> {
        {
            let mut state = self.state.write().await;
            match state.stage {
                Stage::Summary => state.stage = Stage::ProblemQuestions,
                Stage::ProblemQuestions => return Ok(()),
                s => {
                    return Err(FlowError::InvalidTransition {
                        from: s.to_string(),
                        to: Stage::ProblemQuestions.to_string(),
                    })
                }
            }
        }
        self.persist().await;
        Ok(())
    }

    // ── Auth ────────────────────────────────────────────────────────

    /// Submit signup credentials. On immediate session the flow advances;
    /// on confirmation-pending the stage stays at signup and the returned
    /// message is shown inline.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignupFeedback, crate::error::AuthError> {
        match self.identity.sign_up(email, password).await? {
            SignUpOutcome::Session(session) => {
                self.handle_signed_in(session.user).await;
                Ok(SignupFeedback::Authenticated)
            }
            SignUpOutcome::ConfirmationPending { email } => {
                Ok(SignupFeedback::ConfirmationPending {
                    message: format!(
                        "Please check your email to confirm your account. We sent a confirmation link to {email}."
                    ),
                })
            }
        }
    }

    /// Submit sign-in credentials. Advances the flow on success.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), crate::error::AuthError> {
        let session = self.identity.sign_in(email, password).await?;
        self.handle_signed_in(session.user).await;
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), crate::error::AuthError> {
        self.identity.sign_out().await
    }

    /// If the flow sits at signup, settle it: auto-advance when already
    /// authenticated, otherwise run a bounded background auth check and
    /// fall back to presenting the credential form.
    async fn reconcile_auth(&self) {
        let (stage, authenticated) = {
            let state = self.state.read().await;
            (state.stage, state.authenticated)
        };
        if stage != Stage::Signup {
            return;
        }
        if authenticated {
            self.advance_from_signup().await;
            return;
        }

        match timeout(self.config.auth_check_timeout, self.identity.current_user()).await {
            Ok(Ok(Some(user))) => self.handle_signed_in(user).await,
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Background auth check failed, presenting credentials");
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.config.auth_check_timeout,
                    "Background auth check timed out, presenting credentials"
                );
            }
        }
    }

    async fn handle_signed_in(&self, user: UserIdentity) {
        tracing::info!(email = %user.email, "Identity confirmed");
        {
            let mut state = self.state.write().await;
            state.authenticated = true;
        }
        self.persist().await;
        self.advance_from_signup().await;
    }

    /// Sign-out only clears the authenticated flag; the stage never moves
    /// backward on its own.
    async fn handle_signed_out(&self) {
        {
            let mut state = self.state.write().await;
            state.authenticated = false;
        }
        self.persist().await;
    }

    // ── Question loading ────────────────────────────────────────────

    /// Fetch the problem questions and apply the gated transition to
    /// `problem-questions`: the stage changes only once BOTH the minimum
    /// display duration has elapsed AND the data is ready. A source failure
    /// degrades to the deterministic fallback set.
    async fn load_problem_questions(&self) {
        if self.problem_fetch_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let problem = self.state.read().await.initial_problem.clone();
        let minimum = sleep(self.config.question_loading_min);
        let fetch = self.source.problem_questions(&problem);
        let (result, ()) = tokio::join!(fetch, minimum);

        let questions = match result {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => {
                tracing::warn!("Question source returned an empty list, using fallback set");
                fallback_questions(&problem)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Question source failed, using fallback set");
                fallback_questions(&problem)
            }
        };

        {
            let mut state = self.state.write().await;
            if state.stage == Stage::GeneratingQuestions {
                state.problem_questions = questions;
                state.stage = Stage::ProblemQuestions;
            } else {
                tracing::debug!(stage = %state.stage, "Discarding stale question response");
            }
        }
        self.persist().await;
        self.problem_fetch_pending.store(false, Ordering::SeqCst);
    }

    async fn advance_from_signup(&self) {
        if self.state.read().await.stage != Stage::Signup {
            return;
        }

        let questions = self.fetch_firmographic().await;
        {
            let mut state = self.state.write().await;
            if state.stage == Stage::Signup {
                state.firmographic_questions = questions;
                state.stage = Stage::FirmographicQuestions;
            }
        }
        self.persist().await;
    }

    /// Re-populate the (never persisted) firmographic list after a resume.
    async fn refetch_firmographic(&self) {
        let questions = self.fetch_firmographic().await;
        self.state.write().await.firmographic_questions = questions;
    }

    async fn fetch_firmographic(&self) -> Vec<Question> {
        match self.source.firmographic_questions().await {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) | Err(_) => {
                tracing::warn!("Firmographic fetch failed, using built-in catalog");
                firmographic_catalog()
            }
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Write the whole composite state as one atomic batch. Persistence
    /// failures degrade the session to in-memory only.
    async fn persist(&self) {
        let records = self.state.read().await.records();
        if let Err(e) = self.store.put_many(&records).await {
            tracing::warn!(error = %e, "Failed to persist flow state");
        }
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.auth_task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
