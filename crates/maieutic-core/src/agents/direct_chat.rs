// Direct-chat agent (§4.6): `process_chat_message` classifies an utterance with the NLU
// service; an operation intent is handed back as a routing hint rather than re-entered
// directly, so the `Agent` trait stays free of a dependency on `Orchestrator` (which already
// depends on `Agent`). The caller (`maieutic-api`, or the orchestrator's own caller) performs
// the follow-up `route` call when `kind == "operation"`. `toggle_mode` flips session mode.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::{ConversationRole, ConversationTurn, Identity, SessionMode};

use crate::llm::{CompletionRequest, LlmProvider};
use crate::nlu::{Intent, NluContext, NluService};
use crate::orchestrator::{ActionPayload, Agent, AgentResult};
use crate::session;

use super::AgentContext;

pub struct DirectChatAgent {
    ctx: AgentContext,
    nlu_sessions: Mutex<HashMap<Uuid, Arc<NluService<Box<dyn LlmProvider>>>>>,
}

impl DirectChatAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            nlu_sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn classify(&self, session_id: Uuid, nlu_context: &NluContext, utterance: &str) -> Result<Intent> {
        // The NLU service for a session is created lazily and lives for the process lifetime;
        // its ring buffer is advisory memory, not the durable ConversationHistory (§5). Held as
        // an `Arc` so the std::sync::MutexGuard never has to cross the `.await` below.
        let service = {
            let mut sessions = self.nlu_sessions.lock().expect("nlu session map poisoned");
            sessions
                .entry(session_id)
                .or_insert_with(|| {
                    Arc::new(NluService::new(
                        self.ctx.gateway.clone(),
                        self.ctx.config.llm.model.clone(),
                        self.ctx.config.conversation_buffer_size,
                    ))
                })
                .clone()
        };
        service.classify(utterance, nlu_context).await
    }

    async fn append_turn(&self, session_id: Uuid, role: ConversationRole, content: String) -> Result<ConversationTurn> {
        let turn = ConversationTurn {
            id: Uuid::new_v4(),
            session_id,
            sequence: 0, // assigned by the store at insert (§3)
            role,
            content,
            created_at: chrono::Utc::now(),
        };
        self.ctx.work_store.append_conversation_turn(turn).await
    }
}

#[async_trait]
impl Agent for DirectChatAgent {
    fn id(&self) -> &'static str {
        "direct_chat"
    }

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<AgentResult> {
        match action {
            "process_chat_message" => {
                let session_id = payload.require_uuid("session_id")?;
                let utterance = payload.require_str("utterance")?;

                let session = self
                    .ctx
                    .work_store
                    .get_session(session_id)
                    .await?
                    .ok_or(CoreError::UnknownSession(session_id))?;

                self.append_turn(session_id, ConversationRole::User, utterance.to_string()).await?;

                let nlu_context = NluContext {
                    user_id: Some(session.user_id),
                    project_id: Some(session.project_id),
                    session_id: Some(session_id),
                };
                let intent = self.classify(session_id, &nlu_context, utterance).await?;

                let data = match intent {
                    Intent::Operation { operation, params, explanation } => {
                        self.append_turn(
                            session_id,
                            ConversationRole::Assistant,
                            format!("[routed: {operation:?}] {explanation}"),
                        )
                        .await?;
                        serde_json::json!({
                            "kind": "operation",
                            "operation": operation,
                            "params": params,
                            "explanation": explanation,
                        })
                    }
                    Intent::Conversation { response: _ } => {
                        let history = self.ctx.work_store.list_conversation_history(session_id).await?;
                        let transcript = history
                            .iter()
                            .rev()
                            .take(self.ctx.config.conversation_buffer_size)
                            .rev()
                            .map(|t| format!("{}: {}", t.role, t.content))
                            .collect::<Vec<_>>()
                            .join("\n");

                        let request = CompletionRequest {
                            model: self.ctx.config.llm.model.clone(),
                            system: "You are a helpful assistant for a specification-gathering \
                                     workbench, having an ordinary conversation with the user. \
                                     Be concise."
                                .to_string(),
                            user_prompt: format!("{transcript}\nuser: {utterance}"),
                            max_tokens: self.ctx.config.llm.max_tokens_default,
                            temperature: 0.5,
                            json_schema: None,
                        };
                        let completion = self.ctx.gateway.complete(request).await?;
                        self.append_turn(session_id, ConversationRole::Assistant, completion.text.clone()).await?;
                        serde_json::json!({"kind": "conversation", "reply": completion.text})
                    }
                };

                Ok(AgentResult { success: true, data })
            }
            "toggle_mode" => {
                let session_id = payload.require_uuid("session_id")?;
                let mode: SessionMode = payload
                    .require_str("mode")?
                    .parse()
                    .map_err(CoreError::Validation)?;

                let existing = self
                    .ctx
                    .work_store
                    .get_session(session_id)
                    .await?
                    .ok_or(CoreError::UnknownSession(session_id))?;
                let updated = session::toggle_mode(&existing, mode)?;
                let stored = self.ctx.work_store.update_session(updated).await?;

                Ok(AgentResult {
                    success: true,
                    data: serde_json::to_value(&stored).map_err(CoreError::internal)?,
                })
            }
            other => Err(CoreError::Validation(format!("direct_chat agent has no action '{other}'"))),
        }
    }
}
