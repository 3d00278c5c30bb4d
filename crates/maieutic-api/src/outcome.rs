// Maps `maieutic_core::orchestrator::OrchestratorOutcome` onto an HTTP response. Every
// route that calls `Orchestrator::route` returns this instead of hand-rolling the same
// match (§4.7: a blocked response is a 200-family "here's why", never a 4xx/5xx).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use maieutic_core::orchestrator::OrchestratorOutcome;

pub struct RouteResponse(pub OrchestratorOutcome);

impl IntoResponse for RouteResponse {
    fn into_response(self) -> Response {
        match self.0 {
            OrchestratorOutcome::Completed { result, quality_validation } => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": result.success,
                    "data": result.data,
                    "quality_validation": quality_validation,
                })),
            )
                .into_response(),
            OrchestratorOutcome::Blocked(blocked) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": false,
                    "blocked": true,
                    "reason": blocked.reason,
                    "issues": blocked.issues,
                    "path_analysis": blocked.path_analysis,
                    "alternatives": blocked.alternatives,
                })),
            )
                .into_response(),
        }
    }
}
