// Socratic agent (§4.6): picks the next category based on coverage, prompts the LLM gateway,
// stores the question. `generate_question` is quality-gated post-hoc for bias (§4.5.2,
// §8 scenario S2); `generate_questions_batch` runs several single-question generations.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::specification::MATURITY_CATEGORIES;
use maieutic_contracts::{Identity, Question, QuestionGenerationMeta};

use crate::llm::CompletionRequest;
use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::quality::PostValidation;
use crate::specification;

use super::AgentContext;

pub struct SocraticAgent {
    ctx: AgentContext,
}

impl SocraticAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Category with the lowest current-spec coverage breaks ties by declaration order in
    /// `MATURITY_CATEGORIES`, so the question stream systematically sweeps the categories.
    async fn pick_next_category(&self, project_id: Uuid) -> Result<&'static str> {
        let specs = self.ctx.work_store.list_current_specifications(project_id).await?;
        let mut best = MATURITY_CATEGORIES[0];
        let mut best_score = f64::MAX;
        for category in MATURITY_CATEGORIES {
            let score = specification::category_maturity(&specs, category);
            if score < best_score {
                best_score = score;
                best = category;
            }
        }
        Ok(best)
    }

    async fn draft_question(
        &self,
        category: &str,
        role: Option<&str>,
        regeneration_hint: bool,
    ) -> Result<(String, f64)> {
        let bias = &self.ctx.config.bias;
        let mut system = format!(
            "You are a Socratic interviewer helping a team discover specifications for the \
             category '{category}'. Ask exactly one open-ended question that surfaces \
             requirements without presupposing a solution. Never name a specific product, \
             vendor, or technology. Never use phrasing like {:?}.",
            bias.solution_bias_keywords
        );
        if let Some(role) = role {
            system.push_str(&format!(" Frame the question from the perspective of a {role}."));
        }
        if regeneration_hint {
            system.push_str(
                " Your previous draft was rejected for solution bias or leading phrasing. \
                 Rewrite it to be strictly neutral and open-ended.",
            );
        }

        #[derive(Deserialize)]
        struct QuestionDraft {
            question: String,
        }

        let request = CompletionRequest {
            model: self.ctx.config.llm.model.clone(),
            system,
            user_prompt: format!("Category: {category}. Reply with JSON: {{\"question\": \"...\"}}"),
            max_tokens: self.ctx.config.llm.max_tokens_default,
            temperature: 0.7,
            json_schema: None,
        };

        let (draft, _usage) = self.ctx.gateway.complete_structured::<QuestionDraft>(request).await?;
        let validation = crate::quality::post_validate_generate_question(bias, &draft.question);
        Ok((draft.question, validation.quality_score))
    }
}

#[async_trait]
impl Agent for SocraticAgent {
    fn id(&self) -> &'static str {
        "socratic"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "generate_question" => {
                let session_id = payload.require_uuid("session_id")?;
                let session = self
                    .ctx
                    .work_store
                    .get_session(session_id)
                    .await?
                    .ok_or_else(|| CoreError::UnknownSession(session_id))?;

                let regeneration_hint = payload
                    .get("regeneration_hint")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let role = payload.get("role").and_then(|v| v.as_str()).map(|s| s.to_string());

                let category = self.pick_next_category(session.project_id).await?;
                let (text, bias_score) = self
                    .draft_question(category, role.as_deref(), regeneration_hint)
                    .await?;

                let question = Question {
                    id: Uuid::new_v4(),
                    session_id,
                    text: text.clone(),
                    category: category.to_string(),
                    role,
                    generation: QuestionGenerationMeta {
                        bias_score,
                        model_name: self.ctx.config.llm.model.clone(),
                    },
                    created_at: Utc::now(),
                };
                let stored = self.ctx.work_store.create_question(question).await?;

                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            "generate_questions_batch" => {
                let session_id = payload.require_uuid("session_id")?;
                let count = payload.get("count").and_then(|v| v.as_u64()).unwrap_or(3) as usize;
                let mut questions = Vec::with_capacity(count);
                for _ in 0..count {
                    let single = self.execute("generate_question", payload, _identity).await?;
                    questions.push(single.data);
                }
                Ok(AgentResult {
                    success: true,
                    data: serde_json::json!({ "questions": questions }),
                })
            }
            other => Err(CoreError::Validation(format!("socratic agent has no action '{other}'"))),
        }
    }

    async fn post_validate(
        &self,
        action: &str,
        result: &AgentResult,
        _identity: &Identity,
    ) -> Result<PostValidation> {
        if action != "generate_question" {
            return Ok(crate::quality::post_validate_default());
        }
        let text = result
            .data
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(crate::quality::post_validate_generate_question(&self.ctx.config.bias, text))
    }
}
