// Sessions (§4.8, §3 Session lifecycle). `start_session` has no agent in the closed
// inventory (§4.6) - it's a direct store write, like any resource-creation handler that
// doesn't need to route through an LLM-backed agent. `toggle_mode` does route,
// through `direct_chat` (§4.6), since it's gated by the session-ended invariant the agent
// already enforces.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use maieutic_contracts::error::CoreError;
use maieutic_contracts::SessionMode;
use maieutic_core::orchestrator::ActionPayload;
use maieutic_core::session;

use crate::error::ApiResult;
use crate::outcome::RouteResponse;
use crate::state::{AppState, AuthedIdentity};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/projects/:project_id/sessions", post(start_session))
        .route("/v1/sessions/:session_id", get(get_session))
        .route("/v1/sessions/:session_id/history", get(conversation_history))
        .route("/v1/sessions/:session_id/questions", get(list_questions))
        .route("/v1/sessions/:session_id/toggle_mode", post(toggle_mode))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "socratic".to_string()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleModeRequest {
    pub mode: String,
}

#[utoipa::path(
    post,
    path = "/v1/projects/{project_id}/sessions",
    request_body = StartSessionRequest,
    responses((status = 200, description = "Session started", body = maieutic_contracts::Session)),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<Json<maieutic_contracts::Session>> {
    let mode: SessionMode = req.mode.parse().map_err(CoreError::Validation)?;
    state
        .work_store
        .get_project(project_id)
        .await?
        .ok_or(CoreError::UnknownProject(project_id))?;

    let new_session = session::new_session(project_id, identity.user_id, mode);
    let stored = state.work_store.create_session(new_session).await?;
    Ok(Json(stored))
}

pub async fn get_session(
    State(state): State<AppState>,
    AuthedIdentity(_identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<maieutic_contracts::Session>> {
    let session = state
        .work_store
        .get_session(session_id)
        .await?
        .ok_or(CoreError::UnknownSession(session_id))?;
    Ok(Json(session))
}

pub async fn conversation_history(
    State(state): State<AppState>,
    AuthedIdentity(_identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<maieutic_contracts::ConversationTurn>>> {
    let history = state.work_store.list_conversation_history(session_id).await?;
    Ok(Json(history))
}

pub async fn list_questions(
    State(state): State<AppState>,
    AuthedIdentity(_identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<maieutic_contracts::Question>>> {
    let questions = state.work_store.list_questions_for_session(session_id).await?;
    Ok(Json(questions))
}

pub async fn toggle_mode(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ToggleModeRequest>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new()
        .with("session_id", json!(session_id.to_string()))
        .with("mode", json!(req.mode));
    let outcome = state
        .orchestrator
        .route("direct_chat", "toggle_mode", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
