use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tower_http::cors::CorsLayer;

use intake_flow::auth::{HttpIdentityProvider, IdentityProvider};
use intake_flow::config::{env_port, required_env, FlowConfig};
use intake_flow::error::Result;
use intake_flow::flow::{FlowController, Resumed, SignupFeedback, Stage};
use intake_flow::llm::{create_provider, LlmBackend, LlmConfig};
use intake_flow::question::{FallbackQuestionSource, LlmQuestionSource, QuestionSource};
use intake_flow::routes::{api_routes, ApiState};
use intake_flow::store::{LibSqlStore, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let supabase_url = required_env("SUPABASE_URL").inspect_err(|_| {
        eprintln!("Error: SUPABASE_URL not set");
        eprintln!("  export SUPABASE_URL=https://<project>.supabase.co");
    })?;
    let anon_key = required_env("SUPABASE_ANON_KEY").inspect_err(|_| {
        eprintln!("Error: SUPABASE_ANON_KEY not set");
        eprintln!("  export SUPABASE_ANON_KEY=eyJ...");
    })?;

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HttpIdentityProvider::new(&supabase_url, &anon_key));

    // Pick a question source: an LLM when a key is present, otherwise the
    // deterministic canned sets.
    let source: Arc<dyn QuestionSource> = if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
        let model = std::env::var("INTAKE_FLOW_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
        eprintln!("   Questions: Anthropic ({model})");
        let llm = create_provider(&LlmConfig {
            backend: LlmBackend::Anthropic,
            api_key: secrecy::SecretString::from(api_key),
            model,
        })?;
        Arc::new(LlmQuestionSource::new(llm))
    } else if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        let model = std::env::var("INTAKE_FLOW_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        eprintln!("   Questions: OpenAI ({model})");
        let llm = create_provider(&LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from(api_key),
            model,
        })?;
        Arc::new(LlmQuestionSource::new(llm))
    } else {
        eprintln!("   Questions: canned sets (no LLM API key set)");
        Arc::new(FallbackQuestionSource)
    };

    if std::env::args().any(|a| a == "--cli") {
        run_terminal_intake(source, identity).await
    } else {
        serve(source, identity).await
    }
}

/// Run the HTTP API server.
async fn serve(
    source: Arc<dyn QuestionSource>,
    identity: Arc<dyn IdentityProvider>,
) -> Result<()> {
    let port = env_port("INTAKE_FLOW_PORT", 8080)?;

    eprintln!("🧭 Intake Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{port}/api");

    let app = api_routes(ApiState { source, identity }).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Drive one intake conversation over the terminal, resuming any progress
/// left in the local database.
async fn run_terminal_intake(
    source: Arc<dyn QuestionSource>,
    identity: Arc<dyn IdentityProvider>,
) -> Result<()> {
    let db_path =
        std::env::var("INTAKE_FLOW_DB_PATH").unwrap_or_else(|_| "./data/intake-flow.db".to_string());
    let store: Arc<dyn SessionStore> =
        Arc::new(LibSqlStore::new_local(std::path::Path::new(&db_path)).await?);

    eprintln!("🧭 Intake Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Session: {db_path}");
    eprintln!("   /skip to skip a question, /back to revisit the previous one.\n");

    let controller = FlowController::new(FlowConfig::default(), store, source, identity);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if controller.resume().await == Resumed::RedirectToEntry {
        let problem = loop {
            let input = prompt(&mut lines, "What problem are you trying to solve?").await;
            if !input.trim().is_empty() {
                break input;
            }
        };
        eprintln!("\n   Preparing a few questions...\n");
        controller.begin(&problem).await;
    } else {
        eprintln!("   Resuming where you left off.\n");
    }

    loop {
        match controller.stage().await {
            Stage::ProblemQuestions => {
                let answers = collect_answers(&controller, &mut lines, false).await;
                controller.complete_problem_questions(answers).await?;
            }
            Stage::Signup => run_signup(&controller, &mut lines).await?,
            Stage::FirmographicQuestions => {
                let answers = collect_answers(&controller, &mut lines, true).await;
                eprintln!("\n   Putting your summary together...\n");
                controller.complete_firmographic_questions(answers).await?;
            }
            Stage::Summary => {
                let Some(summary) = controller.summary().await else {
                    continue;
                };
                eprintln!("── Summary ─────────────────────────────");
                eprintln!("   Problem: {}", summary.problem);
                for (id, value) in summary.answers.iter() {
                    eprintln!("   {id}: {value}");
                }
                eprintln!("────────────────────────────────────────");
                let choice = prompt(&mut lines, "[e]dit answers, [n]ew project, [q]uit").await;
                match choice.trim() {
                    "e" => controller.edit_answers().await?,
                    "n" => {
                        controller.abandon().await;
                        let problem =
                            prompt(&mut lines, "What problem are you trying to solve?").await;
                        controller.begin(&problem).await;
                    }
                    _ => return Ok(()),
                }
            }
            // Loading stages resolve inside the transitions above.
            Stage::GeneratingQuestions | Stage::GeneratingSummary => {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

async fn run_signup(
    controller: &FlowController,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    eprintln!("   Create an account (or sign in) to continue.");
    while controller.stage().await == Stage::Signup {
        let mode = prompt(lines, "[u] sign up, [i] sign in").await;
        let email = prompt(lines, "Email").await;
        let password = prompt(lines, "Password").await;
        let result = if mode.trim() == "i" {
            controller.sign_in(email.trim(), &password).await
        } else {
            match controller.sign_up(email.trim(), &password).await {
                Ok(SignupFeedback::Authenticated) => Ok(()),
                Ok(SignupFeedback::ConfirmationPending { message }) => {
                    eprintln!("   {message}");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            eprintln!("   {e}");
        }
    }
    Ok(())
}

async fn collect_answers(
    controller: &FlowController,
    lines: &mut Lines<BufReader<Stdin>>,
    firmographic: bool,
) -> intake_flow::question::AnswerSet {
    let mut walker = if firmographic {
        controller.firmographic_walker().await
    } else {
        controller.problem_walker().await
    };

    loop {
        let Some(question) = walker.current().cloned() else {
            break;
        };
        let (index, total) = walker.position();
        eprintln!("\n   [{index}/{total}] {}", question.prompt);
        if !question.rationale.is_empty() {
            eprintln!("         ({})", question.rationale);
        }
        if let Some(choices) = &question.choices {
            eprintln!("         Options: {}", choices.join(" | "));
        }
        if let Some(previous) = walker.current_answer() {
            eprintln!("         Current answer: {previous}");
        }

        let input = prompt(lines, "   >").await;
        let outcome = match input.trim() {
            "/skip" => walker.skip(),
            "/back" => {
                walker.back();
                continue;
            }
            value => walker.answer(value),
        };
        if let Err(e) = outcome {
            eprintln!("   {e}");
        }
    }

    match walker.finish() {
        Ok(answers) => answers,
        Err(e) => {
            eprintln!("   {e}");
            intake_flow::question::AnswerSet::new()
        }
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> String {
    eprintln!("{text}");
    match lines.next_line().await {
        Ok(Some(line)) => line,
        _ => String::new(),
    }
}
