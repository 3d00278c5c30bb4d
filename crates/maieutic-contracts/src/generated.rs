use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedProjectStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for GeneratedProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GeneratedProjectStatus::Pending => "pending",
            GeneratedProjectStatus::Completed => "completed",
            GeneratedProjectStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A code-generation artifact: one `generate_code` run, gated by both the maturity and
/// conflict gates (§4.6, code generator agent). Versioned per project: a project's Nth
/// successful generation has `version = N`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedProject {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version: i32,
    pub status: GeneratedProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedFile {
    pub id: Uuid,
    pub generated_project_id: Uuid,
    pub path: String,
    pub content: String,
    pub line_count: i32,
}
