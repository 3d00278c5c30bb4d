// Code generator agent (§4.6): `maturity_gate` and `conflict_gate` expose the two checks
// `generate` composes; `generate` runs both, then materializes a versioned `GeneratedProject`
// from the project's current specifications as a template-based scaffold.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{GeneratedFile, GeneratedProject, GeneratedProjectStatus, Identity};

use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::quality::{self, PostValidation, PreValidation};

use super::AgentContext;

pub struct CodeGeneratorAgent {
    ctx: AgentContext,
}

impl CodeGeneratorAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    fn scaffold_files(project_name: &str, specs: &[maieutic_contracts::Specification]) -> Vec<(String, String)> {
        let mut readme = format!("# {project_name}\n\nGenerated scaffold from gathered specifications.\n\n");
        for category in maieutic_contracts::MATURITY_CATEGORIES {
            let entries: Vec<_> = specs.iter().filter(|s| s.is_current && s.category == category).collect();
            if entries.is_empty() {
                continue;
            }
            readme.push_str(&format!("## {category}\n\n"));
            for spec in entries {
                let value_text = spec.value.as_str().map(|s| s.to_string()).unwrap_or_else(|| spec.value.to_string());
                readme.push_str(&format!("- **{}**: {value_text}\n", spec.key));
            }
            readme.push('\n');
        }

        let cargo_toml = format!(
            "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n",
            project_name.to_lowercase().replace(' ', "-")
        );
        let main_rs = "fn main() {\n    println!(\"scaffold generated from specification workbench\");\n}\n".to_string();

        vec![
            ("README.md".to_string(), readme),
            ("Cargo.toml".to_string(), cargo_toml),
            ("src/main.rs".to_string(), main_rs),
        ]
    }
}

#[async_trait]
impl Agent for CodeGeneratorAgent {
    fn id(&self) -> &'static str {
        "code_generator"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "maturity_gate" => {
                let project_id = payload.require_uuid("project_id")?;
                let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                let validation = quality::pre_validate_generate_code(&self.ctx.config.quality, &specs, 0);
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&validation).map_err(CoreError::internal)?,
                })
            }
            "conflict_gate" => {
                let project_id = payload.require_uuid("project_id")?;
                let pending = self.ctx.work_store.list_pending_conflicts(project_id).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({"pending_conflicts": pending.len(), "clear": pending.is_empty()}),
                })
            }
            "generate" => {
                let project_id = payload.require_uuid("project_id")?;
                let project = self
                    .ctx
                    .work_store
                    .get_project(project_id)
                    .await?
                    .ok_or(CoreError::UnknownProject(project_id))?;
                let specs = self.ctx.work_store.list_current_specifications(project_id).await?;

                let version = self.ctx.work_store.latest_generated_version(project_id).await? + 1;
                let generated = GeneratedProject {
                    id: Uuid::new_v4(),
                    project_id,
                    version,
                    status: GeneratedProjectStatus::Completed,
                    created_at: Utc::now(),
                };
                let files = Self::scaffold_files(&project.name, &specs)
                    .into_iter()
                    .map(|(path, content)| GeneratedFile {
                        id: Uuid::new_v4(),
                        generated_project_id: generated.id,
                        line_count: content.lines().count() as i32,
                        path,
                        content,
                    })
                    .collect();

                let (stored_project, stored_files) =
                    self.ctx.work_store.create_generated_project(generated, files).await?;

                self.ctx
                    .work_store
                    .append_activity(maieutic_contracts::ActivityLogEntry {
                        id: Uuid::new_v4(),
                        project_id,
                        action_type: "code_generated".to_string(),
                        entity_type: "generated_project".to_string(),
                        entity_id: stored_project.id,
                        description: format!("generated project scaffold version {}", stored_project.version),
                        data: serde_json::json!({"version": stored_project.version}),
                        created_at: Utc::now(),
                    })
                    .await?;

                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({"generated_project": stored_project, "files": stored_files}),
                })
            }
            other => Err(CoreError::Validation(format!("code_generator agent has no action '{other}'"))),
        }
    }

    async fn pre_validate(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<PreValidation> {
        if action != "generate" {
            return Ok(PreValidation {
                blocking: false,
                reason: None,
                issues: Vec::new(),
                path_analysis: None,
                alternatives: Vec::new(),
            });
        }
        let project_id = payload.require_uuid("project_id")?;
        let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
        let pending = self.ctx.work_store.list_pending_conflicts(project_id).await?;

        Ok(quality::pre_validate_generate_code(&self.ctx.config.quality, &specs, pending.len()))
    }

    async fn post_validate(
        &self,
        _action: &str,
        _result: &AgentResult,
        _identity: &Identity,
    ) -> Result<PostValidation> {
        Ok(quality::post_validate_default())
    }
}
