// Maieutic API server
// Decision: thin bindings only - every handler parses the request into an ActionPayload and
// calls Orchestrator::route; no business logic lives in this crate (§4.7, §6).
// Decision: HTTP auth middleware (sessions/OAuth) is out of scope (§1 Non-goals); identity is
// resolved by a pass-through extractor (`state::AuthedIdentity`) a real deployment replaces
// with its own auth layer.

mod auth;
mod code_generation;
mod conflicts;
mod config;
mod direct_chat;
mod error;
mod export;
mod outcome;
mod projects;
mod quality;
mod sessions;
mod socratic;
mod specifications;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use maieutic_anthropic::AnthropicProvider;
use maieutic_core::agents::{
    AgentContext, CodeGeneratorAgent, ConflictAgent, ContextAgent, DirectChatAgent, ProjectManagerAgent,
    QualityAgent, SocraticAgent,
};
use maieutic_core::llm::{LlmGateway, LlmProvider, RetryPolicy};
use maieutic_core::orchestrator::Orchestrator;
use maieutic_core::store::{IdentityStore, WorkStore};
use maieutic_openai::OpenAiProvider;
use maieutic_storage::{Database, MemoryStore};

use config::{Config, LlmProviderChoice};
use state::SharedState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        sessions::start_session,
        socratic::generate_question,
        socratic::generate_questions_batch,
        specifications::extract_specifications,
        conflicts::resolve_conflict,
        quality::analyze_question,
        direct_chat::process_chat_message,
        code_generation::generate,
        export::export_project,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::LoginResponse,
        sessions::StartSessionRequest,
        socratic::GenerateQuestionRequest,
        socratic::GenerateQuestionsBatchRequest,
        specifications::ExtractRequest,
        conflicts::ResolveConflictRequest,
        quality::AnalyzeQuestionRequest,
        direct_chat::ChatMessageRequest,
        maieutic_contracts::User,
        maieutic_contracts::Project,
        maieutic_contracts::Session,
        maieutic_contracts::Question,
        maieutic_contracts::Conflict,
        maieutic_contracts::Specification,
    )),
    tags(
        (name = "auth", description = "Registration, login, logout"),
        (name = "projects", description = "Project CRUD and phase advancement"),
        (name = "sessions", description = "Session lifecycle and conversation history"),
        (name = "socratic", description = "Socratic question generation"),
        (name = "specifications", description = "Specification extraction and listing"),
        (name = "conflicts", description = "Conflict listing and resolution"),
        (name = "quality", description = "Quality and insight analyses"),
        (name = "direct_chat", description = "NLU-routed direct chat"),
        (name = "code_generation", description = "Scaffold generation"),
        (name = "export", description = "Project export"),
    ),
    info(
        title = "Maieutic API",
        version = "0.1.0",
        description = "Agent orchestration and specification-gathering workbench",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

/// A store pair backed by one shared connection: both trait objects coerce from the same
/// `Arc<Database>` (or `Arc<MemoryStore>`), so cloning only bumps the refcount.
async fn build_stores(config: &Config) -> Result<(Arc<dyn WorkStore>, Arc<dyn IdentityStore>)> {
    match &config.database_url {
        Some(url) => {
            let db = Arc::new(Database::from_url(url).await.context("failed to connect to postgres")?);
            Ok((db.clone(), db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, falling back to the in-memory store (not for production)");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
    }
}

fn build_gateway(config: &Config) -> Result<Arc<LlmGateway<Box<dyn LlmProvider>>>> {
    let provider: Box<dyn LlmProvider> = match config.llm_provider {
        LlmProviderChoice::Anthropic => Box::new(AnthropicProvider::from_env()?),
        LlmProviderChoice::OpenAi => Box::new(OpenAiProvider::from_env()?),
    };
    Ok(Arc::new(LlmGateway::new(provider, RetryPolicy::from_config(&config.core.llm))))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maieutic_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("maieutic-api starting...");

    let config = Config::from_env();
    let (work_store, identity_store) = build_stores(&config).await?;
    let core_config = Arc::new(config.core.clone());
    let gateway = build_gateway(&config)?;

    let agent_ctx = AgentContext {
        work_store: work_store.clone(),
        identity_store: identity_store.clone(),
        gateway,
        config: core_config.clone(),
    };

    let orchestrator = Orchestrator::new(core_config.quality.regeneration_cap)
        .register(Box::new(ProjectManagerAgent::new(agent_ctx.clone())))
        .register(Box::new(SocraticAgent::new(agent_ctx.clone())))
        .register(Box::new(ContextAgent::new(agent_ctx.clone())))
        .register(Box::new(ConflictAgent::new(agent_ctx.clone())))
        .register(Box::new(QualityAgent::new(agent_ctx.clone())))
        .register(Box::new(CodeGeneratorAgent::new(agent_ctx.clone())))
        .register(Box::new(DirectChatAgent::new(agent_ctx)));

    let state: state::AppState = Arc::new(SharedState {
        orchestrator,
        work_store,
        identity_store,
        config: core_config,
        route_deadline: config.route_deadline,
    });

    let app = Router::new()
        .route("/health", get(health))
        .merge(auth::routes(state.clone()))
        .merge(projects::routes(state.clone()))
        .merge(sessions::routes(state.clone()))
        .merge(socratic::routes(state.clone()))
        .merge(specifications::routes(state.clone()))
        .merge(conflicts::routes(state.clone()))
        .merge(quality::routes(state.clone()))
        .merge(direct_chat::routes(state.clone()))
        .merge(code_generation::routes(state.clone()))
        .merge(export::routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind to address")?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
