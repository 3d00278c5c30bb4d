use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit/observability trail for a project: phase transitions, conflict resolutions,
/// code-generation runs, and other state changes an operator would want to see without a
/// separate metrics pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
