// Project CRUD + phase advancement (§4.6 `project_manager`). Every handler builds an
// `ActionPayload` and hands it to `Orchestrator::route` - no business logic lives here.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::outcome::RouteResponse;
use crate::state::{AppState, AuthedIdentity};
use maieutic_core::orchestrator::ActionPayload;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/projects", post(create_project).get(list_projects))
        .route(
            "/v1/projects/:project_id",
            get(read_project).put(update_project).delete(delete_project),
        )
        .route("/v1/projects/:project_id/advance_phase", post(advance_phase))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn route(
    state: &AppState,
    identity: &maieutic_contracts::Identity,
    action: &str,
    payload: ActionPayload,
) -> ApiResult<RouteResponse> {
    let outcome = state
        .orchestrator
        .route("project_manager", action, payload, identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

pub async fn create_project(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new()
        .with("name", json!(req.name))
        .with("description", json!(req.description));
    route(&state, &identity, "create", payload).await
}

pub async fn list_projects(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
) -> ApiResult<RouteResponse> {
    route(&state, &identity, "list", ActionPayload::new()).await
}

pub async fn read_project(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    route(&state, &identity, "read", payload).await
}

pub async fn update_project(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<RouteResponse> {
    let mut payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    if let Some(name) = req.name {
        payload = payload.with("name", json!(name));
    }
    if let Some(description) = req.description {
        payload = payload.with("description", json!(description));
    }
    route(&state, &identity, "update", payload).await
}

pub async fn delete_project(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    route(&state, &identity, "delete", payload).await
}

pub async fn advance_phase(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    route(&state, &identity, "advance_phase", payload).await
}
