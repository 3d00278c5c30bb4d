// Storage abstraction. Engines (specification, conflict, quality) never see these traits -
// they operate on plain records passed in by the caller. Agents and the orchestrator hold a
// `dyn WorkStore` / `dyn IdentityStore` and do the I/O the engines are deliberately kept out of.
//
// Two implementations live in maieutic-storage: a Postgres-backed one for production and an
// in-memory one for the property tests in §8, which must run without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use maieutic_contracts::{
    ActivityLogEntry, ApiKey, Conflict, ConversationTurn, GeneratedFile, GeneratedProject,
    NotificationPrefs, Project, ProjectShare, QualityMetric, Question, RefreshToken, Result,
    Session, Specification, User,
};

/// Work-store entities: projects, sessions, questions, specifications, conflicts, quality
/// metrics, activity log, generated artifacts. See §3.
#[async_trait]
pub trait WorkStore: Send + Sync {
    // -- Projects --
    async fn create_project(&self, project: Project) -> Result<Project>;
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;
    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>>;
    async fn update_project(&self, project: Project) -> Result<Project>;
    async fn delete_project(&self, id: Uuid) -> Result<()>;

    // -- Sessions & conversation history --
    async fn create_session(&self, session: Session) -> Result<Session>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;
    async fn update_session(&self, session: Session) -> Result<Session>;
    async fn append_conversation_turn(&self, turn: ConversationTurn) -> Result<ConversationTurn>;
    async fn list_conversation_history(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>>;

    // -- Questions --
    async fn create_question(&self, question: Question) -> Result<Question>;
    async fn list_questions_for_session(&self, session_id: Uuid) -> Result<Vec<Question>>;

    // -- Specifications --
    /// All current specifications for a project, across every category.
    async fn list_current_specifications(&self, project_id: Uuid) -> Result<Vec<Specification>>;
    async fn get_current_specification(
        &self,
        project_id: Uuid,
        category: &str,
        key: &str,
    ) -> Result<Option<Specification>>;
    /// The most recent `limit` specifications by creation time, regardless of currency,
    /// for building a bounded extraction prompt (§4.3 `extract`).
    async fn list_recent_specifications(
        &self,
        project_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Specification>>;
    async fn insert_specification(&self, spec: Specification) -> Result<Specification>;
    /// Atomically mark a specification not-current. Part of the serialized
    /// read-then-write that ingestion requires (§5).
    async fn mark_not_current(&self, spec_id: Uuid) -> Result<()>;

    // -- Conflicts --
    async fn create_conflict(&self, conflict: Conflict) -> Result<Conflict>;
    async fn get_conflict(&self, id: Uuid) -> Result<Option<Conflict>>;
    async fn list_conflicts_for_project(&self, project_id: Uuid) -> Result<Vec<Conflict>>;
    async fn list_pending_conflicts(&self, project_id: Uuid) -> Result<Vec<Conflict>>;
    async fn update_conflict(&self, conflict: Conflict) -> Result<Conflict>;

    // -- Quality metrics --
    async fn record_quality_metric(&self, metric: QualityMetric) -> Result<QualityMetric>;
    async fn list_quality_metrics(&self, project_id: Uuid) -> Result<Vec<QualityMetric>>;

    // -- Activity log --
    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<ActivityLogEntry>;
    async fn list_activity(&self, project_id: Uuid, limit: usize) -> Result<Vec<ActivityLogEntry>>;

    // -- Generated artifacts --
    async fn create_generated_project(
        &self,
        generated: GeneratedProject,
        files: Vec<GeneratedFile>,
    ) -> Result<(GeneratedProject, Vec<GeneratedFile>)>;
    async fn latest_generated_version(&self, project_id: Uuid) -> Result<i32>;
}

/// Identity-store entities: users, credentials, refresh tokens, API keys, project shares,
/// notification prefs. Cross-store references to Work-store ids are opaque (§3).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_login_handle(&self, login_handle: &str) -> Result<Option<User>>;

    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken>;
    async fn get_refresh_token_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;
    async fn revoke_refresh_token(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()>;

    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey>;
    async fn get_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>>;
    async fn touch_api_key(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<()>;
    async fn revoke_api_key(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()>;

    async fn create_share(&self, share: ProjectShare) -> Result<ProjectShare>;
    async fn get_share(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectShare>>;
    async fn list_shares_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectShare>>;

    async fn get_notification_prefs(&self, user_id: Uuid) -> Result<NotificationPrefs>;
    async fn set_notification_prefs(&self, prefs: NotificationPrefs) -> Result<NotificationPrefs>;
}
