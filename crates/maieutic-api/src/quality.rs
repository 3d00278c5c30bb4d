// Quality and insight endpoints (§4.6 `quality`). All four actions are minor operations -
// read-only analyses plus a metrics snapshot write, none of them gated.

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
        .route("/v1/projects/:project_id/coverage", get(analyze_coverage))
        .route("/v1/projects/:project_id/paths", get(compare_paths))
        .route("/v1/projects/:project_id/quality_metrics", post(store_metrics))
        .route("/v1/questions/analyze", post(analyze_question))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeQuestionRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StoreMetricsRequest {
    pub bias_score: Option<f64>,
    pub complexity_score: Option<f64>,
}

pub async fn analyze_coverage(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("quality", "analyze_coverage", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

pub async fn compare_paths(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    let outcome = state
        .orchestrator
        .route("quality", "compare_paths", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

pub async fn store_metrics(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
    Json(req): Json<StoreMetricsRequest>,
) -> ApiResult<RouteResponse> {
    let mut payload = ActionPayload::new().with("project_id", json!(project_id.to_string()));
    if let Some(bias_score) = req.bias_score {
        payload = payload.with("bias_score", json!(bias_score));
    }
    if let Some(complexity_score) = req.complexity_score {
        payload = payload.with("complexity_score", json!(complexity_score));
    }
    let outcome = state
        .orchestrator
        .route("quality", "store_metrics", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/questions/analyze",
    request_body = AnalyzeQuestionRequest,
    responses((status = 200, description = "Bias/leading-question analysis for arbitrary text")),
    tag = "quality"
)]
pub async fn analyze_question(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Json(req): Json<AnalyzeQuestionRequest>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new().with("text", json!(req.text));
    let outcome = state
        .orchestrator
        .route("quality", "analyze_question", payload, &identity, state.route_deadline)
        .await?;
    Ok(RouteResponse(outcome))
}
