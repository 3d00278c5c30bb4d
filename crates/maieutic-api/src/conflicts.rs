// Conflict listing and resolution (§4.6 `conflict`). `resolve` is a major operation;
// `merge` additionally needs the caller to be the conflict's creator or a project editor,
// enforced inside the agent.

use axum::extract::{Path, State};
use axum::routing::{get, post};
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
        .route("/v1/projects/:project_id/conflicts", get(list_conflicts))
        .route("/v1/conflicts/:conflict_id", get(conflict_detail))
        .route("/v1/conflicts/:conflict_id/resolve", post(resolve_conflict))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveConflictRequest {
    /// One of `keep_old`, `replace`, `merge`.
    pub resolution: String,
    /// Required when `resolution == "merge"`.
    pub merged_value: Option<serde_json::Value>,
}

pub async fn list_conflicts(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("conflict", "list", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

pub async fn conflict_detail(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(conflict_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("conflict_id", json!(conflict_id.to_string()));
    let outcome = state
        .orchestrator
        .route("conflict", "detail", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/conflicts/{conflict_id}/resolve",
    request_body = ResolveConflictRequest,
    responses((status = 200, description = "Conflict resolved")),
    tag = "conflicts"
)]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(conflict_id): Path<Uuid>,
    Json(req): Json<ResolveConflictRequest>,
) -> ApiResult<RouteResponse> {
    let mut payload = ActionPayload::new()
        .with("conflict_id", json!(conflict_id.to_string()))
        .with("resolution", json!(req.resolution));
    if let Some(merged_value) = req.merged_value {
        payload = payload.with("merged_value", merged_value);
    }
    let outcome = state
        .orchestrator
        .route("conflict", "resolve", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
