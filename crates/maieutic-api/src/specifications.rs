// Answer submission and specification extraction (§4.6 `context`), plus read-only listing
// of a project's current specifications. `extract_specifications` is a major operation -
// it's how free text becomes durable specification facts and can trigger conflicts.

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
        .route("/v1/projects/:project_id/specifications", get(list_specifications))
        .route("/v1/projects/:project_id/extract", post(extract_specifications))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    /// Free text to extract specification candidates from - an answer, a pasted document,
    /// or a direct-chat message (§4.3 `extract`).
    pub text: String,
}

pub async fn list_specifications(
    State(state): State<AppState>,
    AuthedIdentity(_identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<maieutic_contracts::Specification>>> {
    let specs = state.work_store.list_current_specifications(project_id).await?;
    Ok(Json(specs))
}

#[utoipa::path(
    post,
    path = "/v1/projects/{project_id}/extract",
    request_body = ExtractRequest,
    responses((status = 200, description = "Extraction results, one outcome per candidate")),
    tag = "specifications"
)]
pub async fn extract_specifications(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
    Json(req): Json<ExtractRequest>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new()
        .with("project_id", json!(project_id.to_string()))
        .with("text", json!(req.text));
    let outcome = state
        .orchestrator
        .route("context", "extract_specifications", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
