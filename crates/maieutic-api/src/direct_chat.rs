// Direct-chat message processing (§4.2, §4.6 `direct_chat`). `DirectChatAgent::execute`
// classifies the utterance and, for an operation intent, hands back the operation name plus
// extracted params rather than recursing into the orchestrator itself (see that agent's
// header comment - `Agent` can't depend on `Orchestrator`, which already depends on `Agent`).
// This handler is the caller that closes the loop: it performs the follow-up `route` call.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use maieutic_contracts::Identity;
use maieutic_core::nlu::Operation;
use maieutic_core::orchestrator::{ActionPayload, OrchestratorOutcome};

use crate::error::ApiResult;
use crate::outcome::RouteResponse;
use crate::state::{AppState, AuthedIdentity};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions/:session_id/chat", post(process_chat_message))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatMessageRequest {
    pub utterance: String,
}

/// Maps a classified `Operation` onto the `(agent_id, action)` pair that actually performs
/// it, plus which params carry over. `start_session`/`logout_user` have no corresponding
/// agent action in the closed inventory (§4.6) and are handled as direct store/session calls
/// instead of a second `route` call.
async fn dispatch_operation(
    state: &AppState,
    identity: &Identity,
    project_id_hint: Option<Uuid>,
    operation: Operation,
    params: &std::collections::HashMap<String, serde_json::Value>,
) -> ApiResult<serde_json::Value> {
    let param_str = |key: &str| params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());
    let param_uuid = |key: &str| param_str(key).and_then(|s| Uuid::parse_str(&s).ok());

    let (agent_id, action, payload) = match operation {
        Operation::CreateProject => {
            let name = param_str("name").unwrap_or_else(|| "Untitled project".to_string());
            let description = param_str("description").unwrap_or_default();
            (
                "project_manager",
                "create",
                ActionPayload::new().with("name", json!(name)).with("description", json!(description)),
            )
        }
        Operation::ListProjects => ("project_manager", "list", ActionPayload::new()),
        Operation::AskSocratic => {
            let session_id = param_uuid("session_id").or(None);
            let mut payload = ActionPayload::new();
            if let Some(session_id) = session_id {
                payload = payload.with("session_id", json!(session_id.to_string()));
            }
            ("socratic", "generate_question", payload)
        }
        Operation::ResolveConflict => {
            let conflict_id = param_uuid("conflict_id");
            let resolution = param_str("resolution").unwrap_or_else(|| "keep_old".to_string());
            let mut payload = ActionPayload::new().with("resolution", json!(resolution));
            if let Some(conflict_id) = conflict_id {
                payload = payload.with("conflict_id", json!(conflict_id.to_string()));
            }
            ("conflict", "resolve", payload)
        }
        Operation::ViewInsights => {
            let project_id = param_uuid("project_id").or(project_id_hint);
            let mut payload = ActionPayload::new();
            if let Some(project_id) = project_id {
                payload = payload.with("project_id", json!(project_id.to_string()));
            }
            ("quality", "analyze_coverage", payload)
        }
        Operation::AskQuestion => {
            let project_id = param_uuid("project_id").or(project_id_hint);
            let text = param_str("text").unwrap_or_default();
            let mut payload = ActionPayload::new().with("text", json!(text));
            if let Some(project_id) = project_id {
                payload = payload.with("project_id", json!(project_id.to_string()));
            }
            ("context", "extract_specifications", payload)
        }
        Operation::ToggleMode => {
            let session_id = param_uuid("session_id");
            let mode = param_str("mode").unwrap_or_else(|| "socratic".to_string());
            let mut payload = ActionPayload::new().with("mode", json!(mode));
            if let Some(session_id) = session_id {
                payload = payload.with("session_id", json!(session_id.to_string()));
            }
            ("direct_chat", "toggle_mode", payload)
        }
        // No agent action exists for these; the NLU can still recognize the intent, but
        // acting on it goes through the auth/export handlers directly, not the orchestrator.
        Operation::RegisterUser | Operation::LoginUser | Operation::LogoutUser | Operation::StartSession | Operation::ExportProject => {
            return Ok(json!({
                "kind": "unroutable_operation",
                "operation": operation,
                "note": "this operation has no orchestrator agent action; call its dedicated endpoint instead",
            }));
        }
    };

    let outcome = state
        .orchestrator
        .route(agent_id, action, payload, identity, state.route_deadline)
        .await?;
    Ok(match outcome {
        OrchestratorOutcome::Completed { result, .. } => json!({"kind": "operation_result", "data": result.data}),
        OrchestratorOutcome::Blocked(blocked) => json!({"kind": "blocked", "reason": blocked.reason}),
    })
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/chat",
    request_body = ChatMessageRequest,
    responses((status = 200, description = "Conversational reply or routed operation result")),
    tag = "direct_chat"
)]
pub async fn process_chat_message(
    State(state): State<AppState>,
    AuthedIdentity(identity): AuthedIdentity,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ChatMessageRequest>,
) -> ApiResult<RouteResponse> {
    let payload = ActionPayload::new()
        .with("session_id", json!(session_id.to_string()))
        .with("utterance", json!(req.utterance));

    let outcome = state
        .orchestrator
        .route("direct_chat", "process_chat_message", payload, &identity, state.route_deadline)
        .await?;

    let OrchestratorOutcome::Completed { result, quality_validation } = outcome else {
        return Ok(RouteResponse(outcome));
    };

    if result.data.get("kind").and_then(|v| v.as_str()) != Some("operation") {
        return Ok(RouteResponse(OrchestratorOutcome::Completed { result, quality_validation }));
    }

    let operation: Operation = serde_json::from_value(
        result.data.get("operation").cloned().unwrap_or(serde_json::Value::Null),
    )
    .map_err(|e| maieutic_contracts::error::CoreError::internal(anyhow::anyhow!(e)))?;
    let params: std::collections::HashMap<String, serde_json::Value> = result
        .data
        .get("params")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let session = state.work_store.get_session(session_id).await?;
    let project_id_hint = session.map(|s| s.project_id);

    let dispatched = dispatch_operation(&state, &identity, project_id_hint, operation, &params).await?;

    Ok(RouteResponse(OrchestratorOutcome::Completed {
        result: maieutic_core::orchestrator::AgentResult {
            success: true,
            data: json!({
                "kind": "operation",
                "explanation": result.data.get("explanation"),
                "dispatched": dispatched,
            }),
        },
        quality_validation,
    }))
}
