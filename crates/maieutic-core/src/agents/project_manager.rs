// Project manager agent (§4.6): CRUD over `Project` plus the canonical quality-gated
// `advance_phase`. Pre/post-validation for `advance_phase` delegate to the quality engine;
// every other action is a thin passthrough to the store.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::project::Phase;
use maieutic_contracts::{Identity, Project, ProjectStatus};

use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::quality::{self, PostValidation, PreValidation};
use crate::session;

use super::AgentContext;

pub struct ProjectManagerAgent {
    ctx: AgentContext,
}

impl ProjectManagerAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    async fn load_project(&self, project_id: Uuid) -> Result<Project> {
        self.ctx
            .work_store
            .get_project(project_id)
            .await?
            .ok_or(CoreError::UnknownProject(project_id))
    }
}

#[async_trait]
impl Agent for ProjectManagerAgent {
    fn id(&self) -> &'static str {
        "project_manager"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "create" => {
                let name = payload.require_str("name")?;
                let description = payload.get("description").and_then(|v| v.as_str()).unwrap_or_default();
                if name.trim().is_empty() {
                    return Err(CoreError::Validation("project name must not be empty".to_string()));
                }
                let now = Utc::now();
                let project = Project {
                    id: Uuid::new_v4(),
                    owner_id: identity.user_id,
                    name: name.to_string(),
                    description: description.to_string(),
                    current_phase: Phase::Discovery,
                    maturity_score: 0.0,
                    status: ProjectStatus::Active,
                    created_at: now,
                    updated_at: now,
                };
                let stored = self.ctx.work_store.create_project(project).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            "list" => {
                let projects = self.ctx.work_store.list_projects_for_owner(identity.user_id).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&projects).map_err(CoreError::internal)?,
                })
            }
            "read" => {
                let project_id = payload.require_uuid("project_id")?;
                let project = self.load_project(project_id).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&project).map_err(CoreError::internal)?,
                })
            }
            "update" => {
                let project_id = payload.require_uuid("project_id")?;
                let mut project = self.load_project(project_id).await?;
                if let Some(name) = payload.get("name").and_then(|v| v.as_str()) {
                    project.name = name.to_string();
                }
                if let Some(description) = payload.get("description").and_then(|v| v.as_str()) {
                    project.description = description.to_string();
                }
                project.updated_at = Utc::now();
                let stored = self.ctx.work_store.update_project(project).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            "delete" => {
                let project_id = payload.require_uuid("project_id")?;
                self.ctx.work_store.delete_project(project_id).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({"deleted": project_id}),
                })
            }
            "advance_phase" => {
                let project_id = payload.require_uuid("project_id")?;
                let mut project = self.load_project(project_id).await?;
                let target_phase = project
                    .current_phase
                    .next()
                    .ok_or_else(|| CoreError::Validation("project is already at the final phase".to_string()))?;

                project.current_phase = target_phase;
                project.updated_at = Utc::now();
                let stored = self.ctx.work_store.update_project(project).await?;

                self.ctx
                    .work_store
                    .append_activity(maieutic_contracts::ActivityLogEntry {
                        id: Uuid::new_v4(),
                        project_id: stored.id,
                        action_type: "phase_advanced".to_string(),
                        entity_type: "project".to_string(),
                        entity_id: stored.id,
                        description: format!("advanced to phase {target_phase}"),
                        data: serde_json::json!({"phase": target_phase.to_string()}),
                        created_at: Utc::now(),
                    })
                    .await?;

                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            other => Err(CoreError::Validation(format!("project_manager agent has no action '{other}'"))),
        }
    }

    async fn pre_validate(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<PreValidation> {
        if action != "advance_phase" {
            // Only `advance_phase` is registered as major for this agent (see
            // `orchestrator::is_major_operation`); the orchestrator never calls pre_validate
            // for the others, but the default here stays a harmless no-op regardless.
            return Ok(PreValidation {
                blocking: false,
                reason: None,
                issues: Vec::new(),
                path_analysis: None,
                alternatives: Vec::new(),
            });
        }
        let project_id = payload.require_uuid("project_id")?;
        let project = self.load_project(project_id).await?;
        let Some(target_phase) = project.current_phase.next() else {
            return Ok(PreValidation {
                blocking: true,
                reason: Some("project is already at the final phase".to_string()),
                issues: Vec::new(),
                path_analysis: None,
                alternatives: Vec::new(),
            });
        };

        let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
        let pending = self.ctx.work_store.list_pending_conflicts(project_id).await?;

        Ok(quality::pre_validate_advance_phase(
            &self.ctx.config.quality,
            &self.ctx.config.path_optimizer,
            target_phase,
            &specs,
            pending.len(),
        ))
    }

    async fn post_validate(
        &self,
        action: &str,
        _result: &AgentResult,
        _identity: &Identity,
    ) -> Result<PostValidation> {
        if action != "advance_phase" {
            return Ok(quality::post_validate_default());
        }
        Ok(quality::post_validate_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_phase_none_at_implementation() {
        assert_eq!(Phase::Implementation.next(), None);
        let _ = session::next_phase(Phase::Discovery);
    }
}
