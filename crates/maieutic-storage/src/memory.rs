// In-memory WorkStore/IdentityStore double, for orchestrator/agent tests that shouldn't
// need a live Postgres instance (§B.4): a Mutex-guarded HashMap per entity, no persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{
    ActivityLogEntry, ApiKey, Conflict, ConversationTurn, GeneratedFile, GeneratedProject,
    NotificationPrefs, Project, ProjectShare, QualityMetric, Question, RefreshToken, Session,
    Specification, User,
};
use maieutic_core::store::{IdentityStore, WorkStore};

#[derive(Default)]
struct Tables {
    projects: HashMap<Uuid, Project>,
    sessions: HashMap<Uuid, Session>,
    conversation_turns: HashMap<Uuid, Vec<ConversationTurn>>, // keyed by session_id
    questions: HashMap<Uuid, Vec<Question>>,                  // keyed by session_id
    specifications: HashMap<Uuid, Specification>,
    conflicts: HashMap<Uuid, Conflict>,
    quality_metrics: HashMap<Uuid, Vec<QualityMetric>>, // keyed by project_id
    activity: HashMap<Uuid, Vec<ActivityLogEntry>>,     // keyed by project_id
    generated_projects: HashMap<Uuid, GeneratedProject>,
    generated_files: HashMap<Uuid, Vec<GeneratedFile>>, // keyed by generated_project_id
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
    api_keys: HashMap<Uuid, ApiKey>,
    shares: HashMap<(Uuid, Uuid), ProjectShare>, // keyed by (project_id, user_id)
    notification_prefs: HashMap<Uuid, NotificationPrefs>,
}

/// Process-lifetime, in-memory implementation of both store traits. Not for production
/// use: nothing here survives a restart and there is no real transactional isolation.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl WorkStore for MemoryStore {
    async fn create_project(&self, project: Project) -> Result<Project> {
        let mut t = self.lock();
        t.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.lock().projects.get(&id).cloned())
    }

    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        Ok(self
            .lock()
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_project(&self, project: Project) -> Result<Project> {
        let mut t = self.lock();
        if !t.projects.contains_key(&project.id) {
            return Err(CoreError::UnknownProject(project.id));
        }
        t.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.lock().projects.remove(&id);
        Ok(())
    }

    async fn create_session(&self, session: Session) -> Result<Session> {
        let mut t = self.lock();
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    async fn update_session(&self, session: Session) -> Result<Session> {
        let mut t = self.lock();
        if !t.sessions.contains_key(&session.id) {
            return Err(CoreError::UnknownSession(session.id));
        }
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn append_conversation_turn(&self, mut turn: ConversationTurn) -> Result<ConversationTurn> {
        let mut t = self.lock();
        let turns = t.conversation_turns.entry(turn.session_id).or_default();
        turn.sequence = turns.last().map(|t| t.sequence + 1).unwrap_or(0);
        turns.push(turn.clone());
        Ok(turn)
    }

    async fn list_conversation_history(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .lock()
            .conversation_turns
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_question(&self, question: Question) -> Result<Question> {
        let mut t = self.lock();
        t.questions.entry(question.session_id).or_default().push(question.clone());
        Ok(question)
    }

    async fn list_questions_for_session(&self, session_id: Uuid) -> Result<Vec<Question>> {
        Ok(self.lock().questions.get(&session_id).cloned().unwrap_or_default())
    }

    async fn list_current_specifications(&self, project_id: Uuid) -> Result<Vec<Specification>> {
        Ok(self
            .lock()
            .specifications
            .values()
            .filter(|s| s.project_id == project_id && s.is_current)
            .cloned()
            .collect())
    }

    async fn get_current_specification(
        &self,
        project_id: Uuid,
        category: &str,
        key: &str,
    ) -> Result<Option<Specification>> {
        Ok(self
            .lock()
            .specifications
            .values()
            .find(|s| s.project_id == project_id && s.category == category && s.key == key && s.is_current)
            .cloned())
    }

    async fn list_recent_specifications(&self, project_id: Uuid, limit: usize) -> Result<Vec<Specification>> {
        let t = self.lock();
        let mut specs: Vec<Specification> = t
            .specifications
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        specs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        specs.truncate(limit);
        Ok(specs)
    }

    async fn insert_specification(&self, spec: Specification) -> Result<Specification> {
        let mut t = self.lock();
        t.specifications.insert(spec.id, spec.clone());
        Ok(spec)
    }

    async fn mark_not_current(&self, spec_id: Uuid) -> Result<()> {
        let mut t = self.lock();
        if let Some(spec) = t.specifications.get_mut(&spec_id) {
            spec.is_current = false;
        }
        Ok(())
    }

    async fn create_conflict(&self, conflict: Conflict) -> Result<Conflict> {
        let mut t = self.lock();
        t.conflicts.insert(conflict.id, conflict.clone());
        Ok(conflict)
    }

    async fn get_conflict(&self, id: Uuid) -> Result<Option<Conflict>> {
        Ok(self.lock().conflicts.get(&id).cloned())
    }

    async fn list_conflicts_for_project(&self, project_id: Uuid) -> Result<Vec<Conflict>> {
        Ok(self
            .lock()
            .conflicts
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_pending_conflicts(&self, project_id: Uuid) -> Result<Vec<Conflict>> {
        Ok(self
            .lock()
            .conflicts
            .values()
            .filter(|c| c.project_id == project_id && c.is_pending())
            .cloned()
            .collect())
    }

    async fn update_conflict(&self, conflict: Conflict) -> Result<Conflict> {
        let mut t = self.lock();
        if !t.conflicts.contains_key(&conflict.id) {
            return Err(CoreError::UnknownConflict(conflict.id));
        }
        t.conflicts.insert(conflict.id, conflict.clone());
        Ok(conflict)
    }

    async fn record_quality_metric(&self, metric: QualityMetric) -> Result<QualityMetric> {
        let mut t = self.lock();
        t.quality_metrics.entry(metric.project_id).or_default().push(metric.clone());
        Ok(metric)
    }

    async fn list_quality_metrics(&self, project_id: Uuid) -> Result<Vec<QualityMetric>> {
        Ok(self.lock().quality_metrics.get(&project_id).cloned().unwrap_or_default())
    }

    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<ActivityLogEntry> {
        let mut t = self.lock();
        t.activity.entry(entry.project_id).or_default().push(entry.clone());
        Ok(entry)
    }

    async fn list_activity(&self, project_id: Uuid, limit: usize) -> Result<Vec<ActivityLogEntry>> {
        let t = self.lock();
        let mut entries = t.activity.get(&project_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn create_generated_project(
        &self,
        generated: GeneratedProject,
        files: Vec<GeneratedFile>,
    ) -> Result<(GeneratedProject, Vec<GeneratedFile>)> {
        let mut t = self.lock();
        t.generated_projects.insert(generated.id, generated.clone());
        t.generated_files.insert(generated.id, files.clone());
        Ok((generated, files))
    }

    async fn latest_generated_version(&self, project_id: Uuid) -> Result<i32> {
        Ok(self
            .lock()
            .generated_projects
            .values()
            .filter(|g| g.project_id == project_id)
            .map(|g| g.version)
            .max()
            .unwrap_or(0))
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut t = self.lock();
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_user_by_login_handle(&self, login_handle: &str) -> Result<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.login_handle == login_handle).cloned())
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken> {
        let mut t = self.lock();
        t.refresh_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_refresh_token_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        Ok(self
            .lock()
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_refresh_token(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()> {
        let mut t = self.lock();
        if let Some(token) = t.refresh_tokens.get_mut(&id) {
            token.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn create_api_key(&self, key: ApiKey) -> Result<ApiKey> {
        let mut t = self.lock();
        t.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn get_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        Ok(self.lock().api_keys.values().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn touch_api_key(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<()> {
        let mut t = self.lock();
        if let Some(key) = t.api_keys.get_mut(&id) {
            key.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn revoke_api_key(&self, id: Uuid, revoked_at: DateTime<Utc>) -> Result<()> {
        let mut t = self.lock();
        if let Some(key) = t.api_keys.get_mut(&id) {
            key.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn create_share(&self, share: ProjectShare) -> Result<ProjectShare> {
        let mut t = self.lock();
        t.shares.insert((share.project_id, share.user_id), share.clone());
        Ok(share)
    }

    async fn get_share(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectShare>> {
        Ok(self.lock().shares.get(&(project_id, user_id)).cloned())
    }

    async fn list_shares_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectShare>> {
        Ok(self
            .lock()
            .shares
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_notification_prefs(&self, user_id: Uuid) -> Result<NotificationPrefs> {
        Ok(self
            .lock()
            .notification_prefs
            .get(&user_id)
            .cloned()
            .unwrap_or(NotificationPrefs { user_id, ..Default::default() }))
    }

    async fn set_notification_prefs(&self, prefs: NotificationPrefs) -> Result<NotificationPrefs> {
        let mut t = self.lock();
        t.notification_prefs.insert(prefs.user_id, prefs.clone());
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maieutic_contracts::{Phase, ProjectStatus};

    fn sample_project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "test".to_string(),
            description: String::new(),
            current_phase: Phase::Discovery,
            maturity_score: 0.0,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_a_project() {
        let store = MemoryStore::new();
        let project = sample_project();
        store.create_project(project.clone()).await.unwrap();
        let fetched = store.get_project(project.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, project.id);
    }

    #[tokio::test]
    async fn conversation_turns_get_monotonic_sequence() {
        let store = MemoryStore::new();
        let session_id = Uuid::new_v4();
        let make_turn = || ConversationTurn {
            id: Uuid::new_v4(),
            session_id,
            sequence: 0,
            role: maieutic_contracts::ConversationRole::User,
            content: "hi".to_string(),
            created_at: Utc::now(),
        };
        let first = store.append_conversation_turn(make_turn()).await.unwrap();
        let second = store.append_conversation_turn(make_turn()).await.unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
    }

    #[tokio::test]
    async fn update_project_rejects_unknown_id() {
        let store = MemoryStore::new();
        let project = sample_project();
        let err = store.update_project(project).await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownProject(_)));
    }
}
