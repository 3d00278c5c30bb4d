// Quality agent (§4.6): `analyze_question`, `analyze_coverage`, `compare_paths` expose the
// quality engine's read-only analyses; `store_metrics` persists a `QualityMetric` snapshot.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::Identity;

use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::quality;
use crate::specification;

use super::AgentContext;

pub struct QualityAgent {
    ctx: AgentContext,
}

impl QualityAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Agent for QualityAgent {
    fn id(&self) -> &'static str {
        "quality"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "analyze_question" => {
                let text = payload.require_str("text")?;
                let validation = quality::post_validate_generate_question(&self.ctx.config.bias, text);
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&validation).map_err(CoreError::internal)?,
                })
            }
            "analyze_coverage" => {
                let project_id = payload.require_uuid("project_id")?;
                let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                let overall = specification::maturity(&specs);
                let per_category: Vec<_> = maieutic_contracts::MATURITY_CATEGORIES
                    .iter()
                    .map(|category| {
                        serde_json::json!({
                            "category": category,
                            "maturity": specification::category_maturity(&specs, category),
                        })
                    })
                    .collect();
                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({
                        "overall_maturity": overall,
                        "covered_categories": specification::covered_category_count(&specs),
                        "categories": per_category,
                    }),
                })
            }
            "compare_paths" => {
                let project_id = payload.require_uuid("project_id")?;
                let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                let pending = self.ctx.work_store.list_pending_conflicts(project_id).await?;
                let overall = specification::maturity(&specs);
                let critical_gaps = self
                    .ctx
                    .config
                    .quality
                    .phase_thresholds
                    .values()
                    .flat_map(|t| t.critical_categories.iter())
                    .filter(|c| specification::category_maturity(&specs, c) < 60.0)
                    .count();
                let analysis = quality::build_skip_gaps_paths(
                    &self.ctx.config.path_optimizer,
                    critical_gaps,
                    pending.len(),
                );
                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({"overall_maturity": overall, "path_analysis": analysis}),
                })
            }
            "store_metrics" => {
                let project_id = payload.require_uuid("project_id")?;
                let bias_score = payload.get("bias_score").and_then(|v| v.as_f64()).unwrap_or(1.0);
                let complexity_score = payload.get("complexity_score").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                let coverage_score = specification::maturity(&specs) / 100.0;

                let metric = maieutic_contracts::QualityMetric {
                    id: Uuid::new_v4(),
                    project_id,
                    bias_score,
                    coverage_score,
                    complexity_score,
                    created_at: Utc::now(),
                };
                let stored = self.ctx.work_store.record_quality_metric(metric).await?;
                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            other => Err(CoreError::Validation(format!("quality agent has no action '{other}'"))),
        }
    }
}
