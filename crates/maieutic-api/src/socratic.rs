// Socratic question generation (§4.6 `socratic`). Both actions are major operations
// (orchestrator::is_major_operation) - bias post-validation can trigger a bounded
// regeneration before the draft ever reaches the caller.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use maieutic_core::orchestrator::ActionPayload;

use crate::error::ApiResult;
use crate::outcome::RouteResponse;
use crate::state::{AppState, AuthedIdentity};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions/:session_id/questions/generate", post(generate_question))
        .route("/v1/sessions/:session_id/questions/generate_batch", post(generate_questions_batch))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateQuestionRequest {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateQuestionsBatchRequest {
    #[serde(default = "default_batch_count")]
    pub count: u64,
    pub role: Option<String>,
}

fn default_batch_count() -> u64 {
    3
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/questions/generate",
    request_body = GenerateQuestionRequest,
    responses((status = 200, description = "Question generated or blocked by bias pre-check")),
    tag = "socratic"
)]
pub async fn generate_question(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
    Json(req): Json<GenerateQuestionRequest>,
) -> ApiResult<RouteResponse> {
    let mut payload = ActionPayload::new().with("session_id", json!(session_id.to_string()));
    if let Some(role) = req.role {
        payload = payload.with("role", json!(role));
    }
    let outcome = state
        .orchestrator
        .route("socratic", "generate_question", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/questions/generate_batch",
    request_body = GenerateQuestionsBatchRequest,
    responses((status = 200, description = "Batch of questions generated")),
    tag = "socratic"
)]
pub async fn generate_questions_batch(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
    Json(req): Json<GenerateQuestionsBatchRequest>,
) -> ApiResult<RouteResponse> {
    let mut payload = ActionPayload::new()
        .with("session_id", json!(session_id.to_string()))
        .with("count", json!(req.count));
    if let Some(role) = req.role {
        payload = payload.with("role", json!(role));
    }
    let outcome = state
        .orchestrator
        .route("socratic", "generate_questions_batch", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
