use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionGenerationMeta {
    pub bias_score: f64,
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: Uuid,
    pub session_id: Uuid,
    pub text: String,
    pub category: String,
    /// Professional role the question is framed from, e.g. "security engineer".
    pub role: Option<String>,
    pub generation: QuestionGenerationMeta,
    pub created_at: DateTime<Utc>,
}
