// Postgres row shapes. Enum columns are stored as `TEXT` and converted through each
// domain type's `Display`/`FromStr` at the boundary; nested structs and free-form
// values go through `serde_json::Value` / JSONB.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{
    ActivityLogEntry, ApiKey, Conflict, ConflictResolution, ConflictType, ConversationRole,
    ConversationTurn, GeneratedFile, GeneratedProject, GeneratedProjectStatus, NotificationPrefs,
    Phase, Project, ProjectShare, ProjectStatus, QualityMetric, Question, QuestionGenerationMeta,
    RefreshToken, Session, SessionMode, SessionStatus, ShareRole, Specification,
    SpecificationSource, User,
};

fn parse<T: std::str::FromStr<Err = String>>(column: &'static str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|e: String| CoreError::internal(anyhow::anyhow!("{column}: {e}")))
}

#[derive(Debug, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub current_phase: String,
    pub maturity_score: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRow {
    pub fn into_domain(self) -> Result<Project> {
        Ok(Project {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            current_phase: parse::<Phase>("current_phase", &self.current_phase)?,
            maturity_score: self.maturity_score,
            status: parse::<ProjectStatus>("status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub mode: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn into_domain(self) -> Result<Session> {
        Ok(Session {
            id: self.id,
            project_id: self.project_id,
            user_id: self.user_id,
            mode: parse::<SessionMode>("mode", &self.mode)?,
            status: parse::<SessionStatus>("status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ConversationTurnRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sequence: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurnRow {
    pub fn into_domain(self) -> Result<ConversationTurn> {
        Ok(ConversationTurn {
            id: self.id,
            session_id: self.session_id,
            sequence: self.sequence,
            role: parse::<ConversationRole>("role", &self.role)?,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub text: String,
    pub category: String,
    pub role: Option<String>,
    pub generation: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl QuestionRow {
    pub fn into_domain(self) -> Result<Question> {
        let generation: QuestionGenerationMeta =
            serde_json::from_value(self.generation).map_err(CoreError::internal)?;
        Ok(Question {
            id: self.id,
            session_id: self.session_id,
            text: self.text,
            category: self.category,
            role: self.role,
            generation,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SpecificationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub source: String,
    pub is_current: bool,
    pub supersedes: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpecificationRow {
    pub fn into_domain(self) -> Result<Specification> {
        Ok(Specification {
            id: self.id,
            project_id: self.project_id,
            category: self.category,
            key: self.key,
            value: self.value,
            confidence: self.confidence,
            source: parse::<SpecificationSource>("source", &self.source)?,
            is_current: self.is_current,
            supersedes: self.supersedes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ConflictRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub incumbent_spec_id: Uuid,
    pub new_value: serde_json::Value,
    pub conflict_type: String,
    pub resolution: String,
    pub resolver: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConflictRow {
    pub fn into_domain(self) -> Result<Conflict> {
        Ok(Conflict {
            id: self.id,
            project_id: self.project_id,
            incumbent_spec_id: self.incumbent_spec_id,
            new_value: self.new_value,
            conflict_type: parse::<ConflictType>("conflict_type", &self.conflict_type)?,
            resolution: parse::<ConflictResolution>("resolution", &self.resolution)?,
            resolver: self.resolver,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct QualityMetricRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub bias_score: f64,
    pub coverage_score: f64,
    pub complexity_score: f64,
    pub created_at: DateTime<Utc>,
}

impl QualityMetricRow {
    pub fn into_domain(self) -> QualityMetric {
        QualityMetric {
            id: self.id,
            project_id: self.project_id,
            bias_score: self.bias_score,
            coverage_score: self.coverage_score,
            complexity_score: self.complexity_score,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ActivityLogRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogRow {
    pub fn into_domain(self) -> ActivityLogEntry {
        ActivityLogEntry {
            id: self.id,
            project_id: self.project_id,
            action_type: self.action_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            description: self.description,
            data: self.data,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct GeneratedProjectRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedProjectRow {
    pub fn into_domain(self) -> Result<GeneratedProject> {
        let status = match self.status.as_str() {
            "pending" => GeneratedProjectStatus::Pending,
            "completed" => GeneratedProjectStatus::Completed,
            "failed" => GeneratedProjectStatus::Failed,
            other => {
                return Err(CoreError::internal(anyhow::anyhow!(
                    "unknown generated project status: {other}"
                )))
            }
        };
        Ok(GeneratedProject {
            id: self.id,
            project_id: self.project_id,
            version: self.version,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct GeneratedFileRow {
    pub id: Uuid,
    pub generated_project_id: Uuid,
    pub path: String,
    pub content: String,
    pub line_count: i32,
}

impl GeneratedFileRow {
    pub fn into_domain(self) -> GeneratedFile {
        GeneratedFile {
            id: self.id,
            generated_project_id: self.generated_project_id,
            path: self.path,
            content: self.content,
            line_count: self.line_count,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub login_handle: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_domain(self) -> User {
        User {
            id: self.id,
            login_handle: self.login_handle,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRow {
    pub fn into_domain(self) -> RefreshToken {
        RefreshToken {
            id: self.id,
            user_id: self.user_id,
            token_hash: self.token_hash,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyRow {
    pub fn into_domain(self) -> ApiKey {
        ApiKey {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            prefix: self.prefix,
            key_hash: self.key_hash,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            revoked_at: self.revoked_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProjectShareRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectShareRow {
    pub fn into_domain(self) -> Result<ProjectShare> {
        Ok(ProjectShare {
            id: self.id,
            project_id: self.project_id,
            user_id: self.user_id,
            role: parse::<ShareRole>("role", &self.role)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow, Deserialize)]
pub struct NotificationPrefsRow {
    pub user_id: Uuid,
    pub email_on_conflict: bool,
    pub email_on_phase_advance: bool,
}

impl NotificationPrefsRow {
    pub fn into_domain(self) -> NotificationPrefs {
        NotificationPrefs {
            user_id: self.user_id,
            email_on_conflict: self.email_on_conflict,
            email_on_phase_advance: self.email_on_phase_advance,
        }
    }
}
