// Context agent (§4.6): `extract_specifications` turns free text (an answer, a pasted
// document, a direct-chat message) into specification candidates, then runs each through the
// ingest/conflict pipeline. The LLM call and all I/O live here; the engines in
// `crate::specification` and `crate::conflict` stay pure.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::specification::MATURITY_CATEGORIES;
use maieutic_contracts::{Identity, Specification, SpecificationCandidate};

use crate::conflict::{self, SemanticCheck};
use crate::llm::CompletionRequest;
use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::specification;

use super::AgentContext;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract specification facts from text for a
specification-gathering workbench. Read the supplied text and return a JSON array of candidate
facts: [{"category": "...", "key": "...", "value": <any JSON>, "confidence": 0.0-1.0}]. Valid
categories are: goals, requirements, tech_stack, scalability, security, testing, deployment,
monitoring, team_structure, timeline. Only extract facts actually stated or clearly implied;
never invent one. Return an empty array if nothing qualifies.

You will also be shown the project's existing specifications. Use them to recognize when the
text restates, refines, or contradicts something already on record - a candidate that disagrees
with an existing value should still be extracted as a new candidate under the same
category/key so the downstream conflict check can compare them; do not silently drop it or
silently prefer the old value."#;

/// How many of the project's most-recently-created specifications (regardless of category or
/// currency) to fold into the extraction prompt.
const RECENT_SPEC_CONTEXT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct RawCandidate {
    category: String,
    key: String,
    value: serde_json::Value,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct SemanticCheckResponse {
    contradicts: bool,
    confidence: f64,
}

/// Cheap, local guess at which maturity categories an utterance touches: a category name
/// (underscores read as spaces) appearing anywhere in the lowercased text counts as touched.
/// Good enough to widen the spec context beyond the recency window without another LLM call;
/// the extraction call itself is the source of truth for what actually gets ingested.
fn infer_categories(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    MATURITY_CATEGORIES
        .iter()
        .copied()
        .filter(|&category| lowered.contains(&category.replace('_', " ")) || lowered.contains(category))
        .collect()
}

pub struct ContextAgent {
    ctx: AgentContext,
}

impl ContextAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Bound the project's existing specifications that accompany the extraction prompt: the
    /// most recent `RECENT_SPEC_CONTEXT_LIMIT` by creation time, plus any specification (recent
    /// or not) whose category the utterance appears to be about, so the model can recognize
    /// restatement and disagreement even when the touched category has gone quiet for a while.
    async fn bounded_spec_context(&self, project_id: Uuid, text: &str) -> Result<Vec<Specification>> {
        let mut context = self
            .ctx
            .work_store
            .list_recent_specifications(project_id, RECENT_SPEC_CONTEXT_LIMIT)
            .await?;

        let inferred = infer_categories(text);
        if !inferred.is_empty() {
            let mut seen: std::collections::HashSet<Uuid> = context.iter().map(|s| s.id).collect();
            let current = self.ctx.work_store.list_current_specifications(project_id).await?;
            for spec in current {
                if inferred.iter().any(|category| spec.category == *category) && seen.insert(spec.id) {
                    context.push(spec);
                }
            }
        }
        Ok(context)
    }

    fn render_spec_context(context: &[Specification]) -> String {
        if context.is_empty() {
            return "(no existing specifications yet)".to_string();
        }
        context
            .iter()
            .map(|s| {
                let value = s.value.as_str().map(|v| v.to_string()).unwrap_or_else(|| s.value.to_string());
                format!(
                    "- [{}] {}.{} = {} (current: {}, confidence {:.2})",
                    s.id, s.category, s.key, value, s.is_current, s.confidence
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn extract_candidates(&self, project_id: Uuid, text: &str) -> Result<Vec<SpecificationCandidate>> {
        let spec_context = self.bounded_spec_context(project_id, text).await?;
        let user_prompt = format!(
            "Existing specifications for this project:\n{}\n\nText to extract from:\n{text}",
            Self::render_spec_context(&spec_context)
        );
        let request = CompletionRequest {
            model: self.ctx.config.llm.model.clone(),
            system: EXTRACTION_SYSTEM_PROMPT.to_string(),
            user_prompt,
            max_tokens: self.ctx.config.llm.max_tokens_default,
            temperature: 0.0,
            json_schema: None,
        };
        let (raw, _usage) = self.ctx.gateway.complete_structured::<Vec<RawCandidate>>(request).await?;
        Ok(raw
            .into_iter()
            .map(|r| SpecificationCandidate {
                category: r.category,
                key: r.key,
                value: r.value,
                confidence: r.confidence,
                source: maieutic_contracts::SpecificationSource::Extracted,
            })
            .collect())
    }

    async fn semantic_check(
        &self,
        incumbent: &Specification,
        candidate: &SpecificationCandidate,
    ) -> Result<SemanticCheck> {
        let incumbent_text = incumbent.value.as_str().map(|s| s.to_string()).unwrap_or_else(|| incumbent.value.to_string());
        let candidate_text = candidate.value.as_str().map(|s| s.to_string()).unwrap_or_else(|| candidate.value.to_string());
        let request = CompletionRequest {
            model: self.ctx.config.llm.model.clone(),
            system: "Decide whether two statements about the same specification category \
                     genuinely contradict each other, as opposed to merely phrasing the same \
                     thing differently or adding detail. Reply with JSON: \
                     {\"contradicts\": bool, \"confidence\": 0.0-1.0}."
                .to_string(),
            user_prompt: format!(
                "Existing: {incumbent_text}\nNew: {candidate_text}"
            ),
            max_tokens: 128,
            temperature: 0.0,
            json_schema: None,
        };
        let (response, _usage) = self
            .ctx
            .gateway
            .complete_structured::<SemanticCheckResponse>(request)
            .await?;
        Ok(SemanticCheck {
            contradicts: response.contradicts,
            confidence: response.confidence,
        })
    }

    /// `maturity_score` is a pure function of current specs (invariant 3, §3) but it's cached
    /// on `Project` for cheap reads; recompute and persist it whenever the current-spec set
    /// changes. Never hand-set.
    async fn recompute_maturity(&self, project_id: Uuid) -> Result<()> {
        let mut project = self
            .ctx
            .work_store
            .get_project(project_id)
            .await?
            .ok_or(CoreError::UnknownProject(project_id))?;
        let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
        project.maturity_score = specification::maturity(&specs);
        project.updated_at = chrono::Utc::now();
        self.ctx.work_store.update_project(project).await?;
        Ok(())
    }

    async fn ingest_one(
        &self,
        project_id: Uuid,
        candidate: SpecificationCandidate,
        pending_keys: &[(String, String)],
    ) -> Result<serde_json::Value> {
        specification::ensure_not_blocked(&candidate.category, &candidate.key, pending_keys)?;

        let current = self
            .ctx
            .work_store
            .get_current_specification(project_id, &candidate.category, &candidate.key)
            .await?;

        match specification::plan_ingest(&candidate, current.as_ref()) {
            specification::IngestOutcome::Inserted(mut new_spec) => {
                new_spec.project_id = project_id;
                let stored = self.ctx.work_store.insert_specification(new_spec).await?;
                self.recompute_maturity(project_id).await?;
                Ok(serde_json::json!({"outcome": "inserted", "specification": stored}))
            }
            specification::IngestOutcome::NoOp => Ok(serde_json::json!({"outcome": "no_op"})),
            specification::IngestOutcome::Conflicting { incumbent } => {
                let current_specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                let semantic = if conflict::is_prose_heavy(&candidate.category) {
                    Some(self.semantic_check(&incumbent, &candidate).await?)
                } else {
                    None
                };
                let detected = conflict::detect(
                    &candidate,
                    &current_specs,
                    &conflict::default_cross_key_rules(),
                    semantic,
                );
                if let Some(conflict) = detected {
                    let stored = self.ctx.work_store.create_conflict(conflict).await?;
                    Ok(serde_json::json!({"outcome": "conflicting", "conflict": stored}))
                } else {
                    Ok(serde_json::json!({"outcome": "no_op"}))
                }
            }
        }
    }
}

#[async_trait]
impl Agent for ContextAgent {
    fn id(&self) -> &'static str {
        "context"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "extract_specifications" => {
                let project_id = payload.require_uuid("project_id")?;
                let text = payload.require_str("text")?;

                let candidates = self.extract_candidates(project_id, text).await?;
                let deduped = specification::dedupe_candidates_by_key(candidates);

                let pending = self.ctx.work_store.list_pending_conflicts(project_id).await?;
                let current_specs = self.ctx.work_store.list_current_specifications(project_id).await?;
                // Pending conflicts are recorded against a specific incumbent specification, so
                // the blocked-key set is derived from the specs those conflicts point at.
                let blocked_keys: Vec<(String, String)> = pending
                    .iter()
                    .filter_map(|c| {
                        current_specs
                            .iter()
                            .find(|s| s.id == c.incumbent_spec_id)
                            .map(|s| (s.category.clone(), s.key.clone()))
                    })
                    .collect();

                let mut outcomes = Vec::with_capacity(deduped.len());
                for candidate in deduped {
                    match self.ingest_one(project_id, candidate, &blocked_keys).await {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(CoreError::ProjectBlocked { count }) => {
                            outcomes.push(serde_json::json!({"outcome": "blocked", "count": count}))
                        }
                        Err(err) => return Err(err),
                    }
                }

                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({ "results": outcomes }),
                })
            }
            other => Err(CoreError::Validation(format!("context agent has no action '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_category_from_underscored_and_spaced_mentions() {
        assert_eq!(infer_categories("our tech stack leans heavily on postgres"), vec!["tech_stack"]);
        assert_eq!(infer_categories("timeline is tight, ship by march"), vec!["timeline"]);
        assert!(infer_categories("the weather is nice today").is_empty());
    }

    #[test]
    fn render_spec_context_handles_empty_set() {
        assert_eq!(ContextAgent::render_spec_context(&[]), "(no existing specifications yet)");
    }
}
