// Project export. Loads the records `maieutic_core::export::render`
// needs and streams the result back with the format's content type; `export_project` has
// no agent in the closed inventory (§4.6), so this is a direct store read, like start_session.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use maieutic_contracts::error::CoreError;
use maieutic_core::export::{self, ExportFormat};

use crate::error::ApiResult;
use crate::state::{AppState, AuthedIdentity};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/projects/:project_id/export", get(export_project))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "markdown".to_string()
}

#[utoipa::path(
    get,
    path = "/v1/projects/{project_id}/export",
    params(("format" = Option<String>, Query, description = "\"markdown\" or \"json\"")),
    responses((status = 200, description = "Rendered export document")),
    tag = "export"
)]
pub async fn export_project(
    State(state): State<AppState>,
    AuthedIdentity(_identity): AuthedIdentity,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format: ExportFormat = query.format.parse()?;
    let project = state
        .work_store
        .get_project(project_id)
        .await?
        .ok_or(CoreError::UnknownProject(project_id))?;
    let specs = state.work_store.list_current_specifications(project_id).await?;
    let conflicts = state.work_store.list_conflicts_for_project(project_id).await?;

    let body = export::render(format, &project, &specs, &conflicts)?;
    Ok((
        [(header::CONTENT_TYPE, format.content_type())],
        body,
    )
        .into_response())
}
