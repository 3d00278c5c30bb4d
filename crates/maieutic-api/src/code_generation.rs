// Code generation (§4.6 `code_generator`). `generate` is the only major operation here;
// `maturity_gate`/`conflict_gate` expose the two checks it composes so a caller can preview
// them before spending an actual generation call.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use uuid::Uuid;

use maieutic_core::orchestrator::ActionPayload;

use crate::error::ApiResult;
use crate::outcome::RouteResponse;
use crate::state::{AppState, AuthedIdentity};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/projects/:project_id/generate/maturity_gate", get(maturity_gate))
        .route("/v1/projects/:project_id/generate/conflict_gate", get(conflict_gate))
        .route("/v1/projects/:project_id/generate", post(generate))
        .with_state(state)
}

pub async fn maturity_gate(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("code_generator", "maturity_gate", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

pub async fn conflict_gate(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("code_generator", "conflict_gate", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/projects/{project_id}/generate",
    responses(
        (status = 200, description = "Generated scaffold, or blocked by maturity/conflict gate"),
    ),
    tag = "code_generation"
)]
pub async fn generate(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("code_generator", "generate", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
