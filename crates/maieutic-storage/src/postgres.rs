// Postgres-backed WorkStore/IdentityStore. Every query is a raw SQL string bound through
// sqlx::query_as (no compile-time `query!` macro, so the crate builds without a live
// database to check against).

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{
    ActivityLogEntry, ApiKey, Conflict, ConversationTurn, GeneratedFile, GeneratedProject,
    NotificationPrefs, Project, ProjectShare, QualityMetric, Question, RefreshToken, Session,
    Specification, User,
};
use maieutic_core::store::{IdentityStore, WorkStore};

use crate::models::*;

fn db_err(err: sqlx::Error) -> CoreError {
    CoreError::internal(anyhow::Error::new(err))
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations. Safe to call on every boot: sqlx tracks
    /// which migrations already ran in its own bookkeeping table.
    pub async fn from_url(database_url: &str) -> AnyResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("failed to connect to postgres")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl WorkStore for Database {
    async fn create_project(&self, project: Project) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (id, owner_id, name, description, current_phase, maturity_score, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, name, description, current_phase, maturity_score, status, created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.current_phase.to_string())
        .bind(project.maturity_score)
        .bind(project.status.to_string())
        .bind(project.created_at)
        .bind(project.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, owner_id, name, description, current_phase, maturity_score, status, created_at, updated_at
            FROM projects WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(ProjectRow::into_domain).transpose()
    }

    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, owner_id, name, description, current_phase, maturity_score, status, created_at, updated_at
            FROM projects WHERE owner_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(ProjectRow::into_domain).collect()
    }

    async fn update_project(&self, project: Project) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, current_phase = $4, maturity_score = $5,
                status = $6, updated_at = $7
            WHERE id = $1
            RETURNING id, owner_id, name, description, current_phase, maturity_score, status, created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.current_phase.to_string())
        .bind(project.maturity_score)
        .bind(project.status.to_string())
        .bind(project.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(CoreError::UnknownProject(project.id))?;
        row.into_domain()
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_session(&self, session: Session) -> Result<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, project_id, user_id, mode, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, project_id, user_id, mode, status, created_at, updated_at
            "#,
        )
        .bind(session.id)
        .bind(session.project_id)
        .bind(session.user_id)
        .bind(session.mode.to_string())
        .bind(session.status.to_string())
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, project_id, user_id, mode, status, created_at, updated_at
            FROM sessions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(SessionRow::into_domain).transpose()
    }

    async fn update_session(&self, session: Session) -> Result<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions SET mode = $2, status = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, project_id, user_id, mode, status, created_at, updated_at
            "#,
        )
        .bind(session.id)
        .bind(session.mode.to_string())
        .bind(session.status.to_string())
        .bind(session.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(CoreError::UnknownSession(session.id))?;
        row.into_domain()
    }

    async fn append_conversation_turn(&self, turn: ConversationTurn) -> Result<ConversationTurn> {
        let row = sqlx::query_as::<_, ConversationTurnRow>(
            r#"
            INSERT INTO conversation_turns (id, session_id, sequence, role, content, created_at)
            VALUES (
                $1, $2,
                COALESCE((SELECT MAX(sequence) + 1 FROM conversation_turns WHERE session_id = $2), 0),
                $3, $4, $5
            )
            RETURNING id, session_id, sequence, role, content, created_at
            "#,
        )
        .bind(turn.id)
        .bind(turn.session_id)
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(turn.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn list_conversation_history(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>> {
        let rows = sqlx::query_as::<_, ConversationTurnRow>(
            r#"
            SELECT id, session_id, sequence, role, content, created_at
            FROM conversation_turns WHERE session_id = $1 ORDER BY sequence ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(ConversationTurnRow::into_domain).collect()
    }

    async fn create_question(&self, question: Question) -> Result<Question> {
        let generation = serde_json::to_value(&question.generation).map_err(CoreError::internal)?;
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (id, session_id, text, category, role, generation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, session_id, text, category, role, generation, created_at
            "#,
        )
        .bind(question.id)
        .bind(question.session_id)
        .bind(&question.text)
        .bind(&question.category)
        .bind(&question.role)
        .bind(generation)
        .bind(question.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn list_questions_for_session(&self, session_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, session_id, text, category, role, generation, created_at
            FROM questions WHERE session_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(QuestionRow::into_domain).collect()
    }

    async fn list_current_specifications(&self, project_id: Uuid) -> Result<Vec<Specification>> {
        let rows = sqlx::query_as::<_, SpecificationRow>(
            r#"
            SELECT id, project_id, category, key, value, confidence, source, is_current, supersedes, created_at, updated_at
            FROM specifications WHERE project_id = $1 AND is_current ORDER BY category, key
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SpecificationRow::into_domain).collect()
    }

    async fn get_current_specification(
        &self,
        project_id: Uuid,
        category: &str,
        key: &str,
    ) -> Result<Option<Specification>> {
        let row = sqlx::query_as::<_, SpecificationRow>(
            r#"
            SELECT id, project_id, category, key, value, confidence, source, is_current, supersedes, created_at, updated_at
            FROM specifications WHERE project_id = $1 AND category = $2 AND key = $3 AND is_current
            "#,
        )
        .bind(project_id)
        .bind(category)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(SpecificationRow::into_domain).transpose()
    }

    async fn list_recent_specifications(&self, project_id: Uuid, limit: usize) -> Result<Vec<Specification>> {
        let rows = sqlx::query_as::<_, SpecificationRow>(
            r#"
            SELECT id, project_id, category, key, value, confidence, source, is_current, supersedes, created_at, updated_at
            FROM specifications WHERE project_id = $1 ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SpecificationRow::into_domain).collect()
    }

    async fn insert_specification(&self, spec: Specification) -> Result<Specification> {
        let row = sqlx::query_as::<_, SpecificationRow>(
            r#"
            INSERT INTO specifications (id, project_id, category, key, value, confidence, source, is_current, supersedes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, project_id, category, key, value, confidence, source, is_current, supersedes, created_at, updated_at
            "#,
        )
        .bind(spec.id)
        .bind(spec.project_id)
        .bind(&spec.category)
        .bind(&spec.key)
        .bind(&spec.value)
        .bind(spec.confidence)
        .bind(spec.source.to_string())
        .bind(spec.is_current)
        .bind(spec.supersedes)
        .bind(spec.created_at)
        .bind(spec.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn mark_not_current(&self, spec_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE specifications SET is_current = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(spec_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_conflict(&self, conflict: Conflict) -> Result<Conflict> {
        let row = sqlx::query_as::<_, ConflictRow>(
            r#"
            INSERT INTO conflicts (id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at
            "#,
        )
        .bind(conflict.id)
        .bind(conflict.project_id)
        .bind(conflict.incumbent_spec_id)
        .bind(&conflict.new_value)
        .bind(conflict.conflict_type.to_string())
        .bind(conflict.resolution.to_string())
        .bind(conflict.resolver)
        .bind(conflict.resolved_at)
        .bind(conflict.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn get_conflict(&self, id: Uuid) -> Result<Option<Conflict>> {
        let row = sqlx::query_as::<_, ConflictRow>(
            r#"
            SELECT id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at
            FROM conflicts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(ConflictRow::into_domain).transpose()
    }

    async fn list_conflicts_for_project(&self, project_id: Uuid) -> Result<Vec<Conflict>> {
        let rows = sqlx::query_as::<_, ConflictRow>(
            r#"
            SELECT id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at
            FROM conflicts WHERE project_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(ConflictRow::into_domain).collect()
    }

    async fn list_pending_conflicts(&self, project_id: Uuid) -> Result<Vec<Conflict>> {
        let rows = sqlx::query_as::<_, ConflictRow>(
            r#"
            SELECT id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at
            FROM conflicts WHERE project_id = $1 AND resolution = 'pending' ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(ConflictRow::into_domain).collect()
    }

    async fn update_conflict(&self, conflict: Conflict) -> Result<Conflict> {
        let row = sqlx::query_as::<_, ConflictRow>(
            r#"
            UPDATE conflicts SET resolution = $2, resolver = $3, resolved_at = $4
            WHERE id = $1
            RETURNING id, project_id, incumbent_spec_id, new_value, conflict_type, resolution, resolver, resolved_at, created_at
            "#,
        )
        .bind(conflict.id)
        .bind(conflict.resolution.to_string())
        .bind(conflict.resolver)
        .bind(conflict.resolved_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(CoreError::UnknownConflict(conflict.id))?;
        row.into_domain()
    }

    async fn record_quality_metric(&self, metric: QualityMetric) -> Result<QualityMetric> {
        let row = sqlx::query_as::<_, QualityMetricRow>(
            r#"
            INSERT INTO quality_metrics (id, project_id, bias_score, coverage_score, complexity_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, project_id, bias_score, coverage_score, complexity_score, created_at
            "#,
        )
        .bind(metric.id)
        .bind(metric.project_id)
        .bind(metric.bias_score)
        .bind(metric.coverage_score)
        .bind(metric.complexity_score)
        .bind(metric.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }

    async fn list_quality_metrics(&self, project_id: Uuid) -> Result<Vec<QualityMetric>> {
        let rows = sqlx::query_as::<_, QualityMetricRow>(
            r#"
            SELECT id, project_id, bias_score, coverage_score, complexity_score, created_at
            FROM quality_metrics WHERE project_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(QualityMetricRow::into_domain).collect())
    }

    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<ActivityLogEntry> {
        let row = sqlx::query_as::<_, ActivityLogRow>(
            r#"
            INSERT INTO activity_log (id, project_id, action_type, entity_type, entity_id, description, data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, project_id, action_type, entity_type, entity_id, description, data, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.project_id)
        .bind(&entry.action_type)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.description)
        .bind(&entry.data)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }

    async fn list_activity(&self, project_id: Uuid, limit: usize) -> Result<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityLogRow>(
            r#"
            SELECT id, project_id, action_type, entity_type, entity_id, description, data, created_at
            FROM activity_log WHERE project_id = $1 ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(ActivityLogRow::into_domain).collect())
    }

    async fn create_generated_project(
        &self,
        generated: GeneratedProject,
        files: Vec<GeneratedFile>,
    ) -> Result<(GeneratedProject, Vec<GeneratedFile>)> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let project_row = sqlx::query_as::<_, GeneratedProjectRow>(
            r#"
            INSERT INTO generated_projects (id, project_id, version, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, version, status, created_at
            "#,
        )
        .bind(generated.id)
        .bind(generated.project_id)
        .bind(generated.version)
        .bind(generated.status.to_string())
        .bind(generated.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut stored_files = Vec::with_capacity(files.len());
        for file in files {
            let row = sqlx::query_as::<_, GeneratedFileRow>(
                r#"
                INSERT INTO generated_files (id, generated_project_id, path, content, line_count)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, generated_project_id, path, content, line_count
                "#,
            )
            .bind(file.id)
            .bind(file.generated_project_id)
            .bind(&file.path)
            .bind(&file.content)
            .bind(file.line_count)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            stored_files.push(row.into_domain());
        }

        tx.commit().await.map_err(db_err)?;
        Ok((project_row.into_domain()?, stored_files))
    }

    async fn latest_generated_version(&self, project_id: Uuid) -> Result<i32> {
        let version: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version) FROM generated_projects WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(version.unwrap_or(0))
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn create_user(&self, user: User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, login_handle, password_hash, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, login_handle, password_hash, is_admin, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.login_handle)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login_handle, password_hash, is_admin, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(UserRow::into_domain))
    }

    async fn get_user_by_login_handle(&self, login_handle: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, login_handle, password_hash, is_admin, created_at, updated_at
            FROM users WHERE login_handle = $1
            "#,
        )
        .bind(login_handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(UserRow::into_domain))
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, created_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, token_hash, created_at, expires_at, revoked_at
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }

    async fn get_refresh_token_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token_hash, created_at, expires_at, revoked_at
            FROM refresh_tokens WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(RefreshTokenRow::into_domain))
    }

    async fn revoke_refresh_token(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1")
            .bind(id)
            .bind(revoked_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            INSERT INTO api_keys (id, user_id, name, prefix, key_hash, created_at, last_used_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, name, prefix, key_hash, created_at, last_used_at, revoked_at
            "#,
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.name)
        .bind(&key.prefix)
        .bind(&key.key_hash)
        .bind(key.created_at)
        .bind(key.last_used_at)
        .bind(key.revoked_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }

    async fn get_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, user_id, name, prefix, key_hash, created_at, last_used_at, revoked_at
            FROM api_keys WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(ApiKeyRow::into_domain))
    }

    async fn touch_api_key(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn revoke_api_key(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE api_keys SET revoked_at = $2 WHERE id = $1")
            .bind(id)
            .bind(revoked_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_share(&self, share: ProjectShare) -> Result<ProjectShare> {
        let row = sqlx::query_as::<_, ProjectShareRow>(
            r#"
            INSERT INTO project_shares (id, project_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(share.id)
        .bind(share.project_id)
        .bind(share.user_id)
        .bind(share.role.to_string())
        .bind(share.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }

    async fn get_share(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectShare>> {
        let row = sqlx::query_as::<_, ProjectShareRow>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_shares WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(ProjectShareRow::into_domain).transpose()
    }

    async fn list_shares_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectShare>> {
        let rows = sqlx::query_as::<_, ProjectShareRow>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_shares WHERE project_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(ProjectShareRow::into_domain).collect()
    }

    async fn get_notification_prefs(&self, user_id: Uuid) -> Result<NotificationPrefs> {
        let row = sqlx::query_as::<_, NotificationPrefsRow>(
            r#"
            SELECT user_id, email_on_conflict, email_on_phase_advance
            FROM notification_prefs WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row
            .map(NotificationPrefsRow::into_domain)
            .unwrap_or(NotificationPrefs { user_id, ..Default::default() }))
    }

    async fn set_notification_prefs(&self, prefs: NotificationPrefs) -> Result<NotificationPrefs> {
        let row = sqlx::query_as::<_, NotificationPrefsRow>(
            r#"
            INSERT INTO notification_prefs (user_id, email_on_conflict, email_on_phase_advance)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
                SET email_on_conflict = EXCLUDED.email_on_conflict,
                    email_on_phase_advance = EXCLUDED.email_on_phase_advance
            RETURNING user_id, email_on_conflict, email_on_phase_advance
            "#,
        )
        .bind(prefs.user_id)
        .bind(prefs.email_on_conflict)
        .bind(prefs.email_on_phase_advance)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into_domain())
    }
}
