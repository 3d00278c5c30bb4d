use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted snapshot of a post-validation's quality score, written by the Quality agent's
/// `store_metrics` action (§4.6). Distinct from the transient `PostValidation` result the
/// orchestrator computes on every major call - this is what survives it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QualityMetric {
    pub id: Uuid,
    pub project_id: Uuid,
    pub bias_score: f64,
    pub coverage_score: f64,
    pub complexity_score: f64,
    pub created_at: DateTime<Utc>,
}
