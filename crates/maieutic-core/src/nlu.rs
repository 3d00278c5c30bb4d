// Natural-language understanding service (§4.2). Converts an utterance plus optional
// (user, project, session) context into either an operation intent or a conversational reply.
//
// Conversation memory is a per-process, per-session bounded ring buffer - O(1) append, oldest
// evicted automatically, never persisted. Dialogue durability belongs to the Session component
// (ConversationHistory), not here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::llm::{CompletionRequest, CompletionUsage, LlmGateway, LlmProvider};
use maieutic_contracts::error::Result;

/// Closed set of operations the NLU service may recognize. Adding to this set is a source
/// change, not a runtime capability (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    RegisterUser,
    LoginUser,
    LogoutUser,
    CreateProject,
    ListProjects,
    StartSession,
    AskQuestion,
    ResolveConflict,
    ViewInsights,
    ExportProject,
    AskSocratic,
    ToggleMode,
}

#[derive(Debug, Clone)]
pub enum Intent {
    Operation {
        operation: Operation,
        params: HashMap<String, serde_json::Value>,
        explanation: String,
    },
    Conversation {
        response: String,
    },
}

/// The raw shape an LLM is asked to return; deserialized then mapped to `Intent`.
#[derive(Debug, Deserialize)]
struct IntentEnvelope {
    is_operation: bool,
    operation: Option<Operation>,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    User,
    Nlu,
}

#[derive(Debug, Clone)]
struct MemoryTurn {
    speaker: Turn,
    text: String,
}

/// Fixed-capacity ring buffer of the last N turns for one session. Never grows past capacity;
/// the oldest turn is dropped on overflow.
struct RingBuffer {
    capacity: usize,
    turns: VecDeque<MemoryTurn>,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, turn: MemoryTurn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| {
                let speaker = match t.speaker {
                    Turn::User => "user",
                    Turn::Nlu => "assistant",
                };
                format!("{speaker}: {}", t.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Optional resolved context the caller already has, folded into the extraction prompt.
#[derive(Debug, Clone, Default)]
pub struct NluContext {
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

const SYSTEM_PROMPT: &str = r#"You are the intent classifier for a specification-gathering workbench.
Given a user utterance, decide whether it requests one of a fixed set of operations, or is
plain conversation. Reply with JSON only:
{"is_operation": bool, "operation": "<one of register_user|login_user|logout_user|
create_project|list_projects|start_session|ask_question|resolve_conflict|view_insights|
export_project|ask_socratic|toggle_mode>" | null, "params": {...}, "explanation": "...",
"response": "..."}
Set is_operation=false and fill "response" with a natural reply when the utterance is not one
of the listed operations. Never invent an operation outside that list."#;

/// Bounded-memory intent classifier. One instance per session; the orchestrator's direct-chat
/// agent (§4.6) holds a map of `session_id -> NluService`. The gateway is shared (`Arc`)
/// because one `LlmGateway` instance backs every session's classifier.
pub struct NluService<P: LlmProvider> {
    gateway: Arc<LlmGateway<P>>,
    model: String,
    buffer: Mutex<RingBuffer>,
}

impl<P: LlmProvider> NluService<P> {
    pub fn new(gateway: Arc<LlmGateway<P>>, model: impl Into<String>, buffer_capacity: usize) -> Self {
        Self {
            gateway,
            model: model.into(),
            buffer: Mutex::new(RingBuffer::new(buffer_capacity)),
        }
    }

    /// Classify an utterance. On any LLM failure to produce a parseable intent envelope, the
    /// service degrades to `Intent::Conversation` with the raw text echoed back, per §4.2's
    /// failure model - it does not propagate the LLM error to the caller.
    pub async fn classify(&self, utterance: &str, _context: &NluContext) -> Result<Intent> {
        let history = {
            let buffer = self.buffer.lock().expect("nlu ring buffer poisoned");
            buffer.render()
        };

        let user_prompt = if history.is_empty() {
            utterance.to_string()
        } else {
            format!("Conversation so far:\n{history}\n\nNew utterance: {utterance}")
        };

        let request = CompletionRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user_prompt,
            max_tokens: 512,
            temperature: 0.0,
            json_schema: None,
        };

        let intent = match self
            .gateway
            .complete_structured::<IntentEnvelope>(request)
            .await
        {
            Ok((envelope, _usage)) => envelope_to_intent(envelope, utterance),
            Err(_) => Intent::Conversation {
                response: utterance.to_string(),
            },
        };

        self.remember(utterance, &intent);
        Ok(intent)
    }

    fn remember(&self, utterance: &str, intent: &Intent) {
        let mut buffer = self.buffer.lock().expect("nlu ring buffer poisoned");
        buffer.push(MemoryTurn {
            speaker: Turn::User,
            text: utterance.to_string(),
        });
        let summary = match intent {
            Intent::Operation { operation, .. } => format!("[routed to {operation:?}]"),
            Intent::Conversation { response } => response.clone(),
        };
        buffer.push(MemoryTurn {
            speaker: Turn::Nlu,
            text: summary,
        });
    }
}

fn envelope_to_intent(envelope: IntentEnvelope, fallback_text: &str) -> Intent {
    if envelope.is_operation {
        match envelope.operation {
            Some(operation) => Intent::Operation {
                operation,
                params: envelope.params,
                explanation: envelope.explanation,
            },
            None => Intent::Conversation {
                response: if envelope.response.is_empty() {
                    fallback_text.to_string()
                } else {
                    envelope.response
                },
            },
        }
    } else {
        Intent::Conversation {
            response: if envelope.response.is_empty() {
                fallback_text.to_string()
            } else {
                envelope.response
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, RetryPolicy};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedProvider {
        text: String,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete_once(&self, _r: &CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                text: self.text.clone(),
                usage: CompletionUsage::default(),
                latency: Duration::ZERO,
            })
        }
    }

    #[tokio::test]
    async fn classifies_operation_intent() {
        let provider = FixedProvider {
            text: r#"{"is_operation": true, "operation": "create_project", "params": {"name": "x"}, "explanation": "user wants a project"}"#.to_string(),
        };
        let service = NluService::new(
            Arc::new(LlmGateway::new(provider, RetryPolicy::default())),
            "test-model",
            20,
        );
        let intent = service
            .classify("make me a new project called x", &NluContext::default())
            .await
            .unwrap();
        match intent {
            Intent::Operation { operation, .. } => assert_eq!(operation, Operation::CreateProject),
            other => panic!("expected operation intent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn degrades_to_conversation_on_unparseable_response() {
        let provider = FixedProvider {
            text: "not json at all".to_string(),
        };
        let service = NluService::new(
            Arc::new(LlmGateway::new(provider, RetryPolicy::default())),
            "test-model",
            20,
        );
        let intent = service
            .classify("hello there", &NluContext::default())
            .await
            .unwrap();
        match intent {
            Intent::Conversation { response } => assert_eq!(response, "hello there"),
            _ => panic!("expected conversational fallback"),
        }
    }

    #[tokio::test]
    async fn ring_buffer_is_bounded() {
        let mut buf = RingBuffer::new(2);
        buf.push(MemoryTurn {
            speaker: Turn::User,
            text: "a".into(),
        });
        buf.push(MemoryTurn {
            speaker: Turn::User,
            text: "b".into(),
        });
        buf.push(MemoryTurn {
            speaker: Turn::User,
            text: "c".into(),
        });
        assert_eq!(buf.turns.len(), 2);
        assert_eq!(buf.render(), "user: b\nuser: c");
    }
}
