// Conflict agent (§4.6): `resolve` actions a pending conflict with keep_old / replace / merge,
// updating the conflict record and, for replace/merge, superseding the incumbent specification.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{ConflictResolution, Identity, SpecificationCandidate, SpecificationSource};

use crate::conflict::can_merge;
use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::specification;

use super::AgentContext;

pub struct ConflictAgent {
    ctx: AgentContext,
}

impl ConflictAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Agent for ConflictAgent {
    fn id(&self) -> &'static str {
        "conflict"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "list" => {
                let project_id = payload.require_uuid("project_id")?;
                let conflicts = self.ctx.work_store.list_conflicts_for_project(project_id).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&conflicts).map_err(CoreError::internal)?,
                })
            }
            "detail" => {
                let conflict_id = payload.require_uuid("conflict_id")?;
                let conflict = self
                    .ctx
                    .work_store
                    .get_conflict(conflict_id)
                    .await?
                    .ok_or(CoreError::UnknownConflict(conflict_id))?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&conflict).map_err(CoreError::internal)?,
                })
            }
            "resolve" => {
                let conflict_id = payload.require_uuid("conflict_id")?;
                let resolution_str = payload.require_str("resolution")?;
                let resolution: ConflictResolution = resolution_str
                    .parse()
                    .map_err(CoreError::InvalidResolution)?;
                if resolution == ConflictResolution::Pending {
                    return Err(CoreError::InvalidResolution(
                        "cannot resolve a conflict to 'pending'".to_string(),
                    ));
                }

                let mut conflict = self
                    .ctx
                    .work_store
                    .get_conflict(conflict_id)
                    .await?
                    .ok_or(CoreError::UnknownConflict(conflict_id))?;
                if !conflict.is_pending() {
                    return Err(CoreError::InvalidResolution(
                        "conflict has already been resolved".to_string(),
                    ));
                }

                if resolution == ConflictResolution::Merge {
                    let share = self
                        .ctx
                        .identity_store
                        .get_share(conflict.project_id, identity.user_id)
                        .await?;
                    let is_editor = share
                        .map(|s| s.role == maieutic_contracts::ShareRole::Editor)
                        .unwrap_or(false);
                    let project = self
                        .ctx
                        .work_store
                        .get_project(conflict.project_id)
                        .await?
                        .ok_or(CoreError::UnknownProject(conflict.project_id))?;
                    let is_creator = project.owner_id == identity.user_id;
                    if !can_merge(is_creator, is_editor, self.ctx.config.merge_requires_editor) {
                        return Err(CoreError::PermissionDenied(
                            "only the conflict's creator or a project editor may merge".to_string(),
                        ));
                    }
                }

                if resolution == ConflictResolution::Merge && payload.get("merged_value").is_none() {
                    return Err(CoreError::InvalidResolution(
                        "merge requires a caller-supplied merged_value".to_string(),
                    ));
                }

                if matches!(resolution, ConflictResolution::Replace | ConflictResolution::Merge) {
                    // category/key aren't stored on Conflict directly; recovered via the
                    // incumbent spec id through the current-specifications listing.
                    let current_specs = self
                        .ctx
                        .work_store
                        .list_current_specifications(conflict.project_id)
                        .await?;
                    let incumbent_spec = current_specs
                        .iter()
                        .find(|s| s.id == conflict.incumbent_spec_id)
                        .cloned()
                        .ok_or(CoreError::UnknownSpecification(conflict.incumbent_spec_id))?;

                    self.ctx.work_store.mark_not_current(incumbent_spec.id).await?;

                    let merged_value = if resolution == ConflictResolution::Merge {
                        // Caller-supplied merged value, per §4.3 `resolve`. Presence
                        // was already checked above.
                        payload.get("merged_value").cloned().unwrap()
                    } else {
                        conflict.new_value.clone()
                    };

                    let candidate = SpecificationCandidate {
                        category: incumbent_spec.category.clone(),
                        key: incumbent_spec.key.clone(),
                        value: merged_value,
                        confidence: incumbent_spec.confidence,
                        source: SpecificationSource::UserInput,
                    };
                    let mut new_spec = specification::new_specification(&candidate, Some(incumbent_spec.id));
                    new_spec.project_id = conflict.project_id;
                    self.ctx.work_store.insert_specification(new_spec).await?;

                    // maturity_score is cached on Project but is a pure function of current
                    // specs (invariant 3, §3); refresh it now that the current set changed.
                    if let Some(mut project) = self.ctx.work_store.get_project(conflict.project_id).await? {
                        let specs = self.ctx.work_store.list_current_specifications(conflict.project_id).await?;
                        project.maturity_score = specification::maturity(&specs);
                        project.updated_at = Utc::now();
                        self.ctx.work_store.update_project(project).await?;
                    }
                }

                conflict.resolution = resolution;
                conflict.resolver = Some(identity.user_id);
                conflict.resolved_at = Some(Utc::now());
                let stored = self.ctx.work_store.update_conflict(conflict).await?;

                self.ctx
                    .work_store
                    .append_activity(maieutic_contracts::ActivityLogEntry {
                        id: Uuid::new_v4(),
                        project_id: stored.project_id,
                        action_type: "conflict_resolved".to_string(),
                        entity_type: "conflict".to_string(),
                        entity_id: stored.id,
                        description: format!("conflict resolved as {resolution}"),
                        data: serde_json::json!({"resolution": resolution.to_string()}),
                        created_at: Utc::now(),
                    })
                    .await?;

                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            other => Err(CoreError::Validation(format!("conflict agent has no action '{other}'"))),
        }
    }
}
