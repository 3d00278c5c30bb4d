// Orchestrator (§4.7): routes `(agent_id, action, payload, identity)` to a named agent,
// interposing pre/post quality gates on major operations and supporting a bounded
// regeneration loop when a post-check demands it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::Identity;

use crate::quality::{PostValidation, PreValidation};

/// Static table of `(agent_id, action) -> major?` (§4.7 step 2, GLOSSARY "Major operation").
/// Anything not listed here is minor and bypasses both gates.
pub fn is_major_operation(agent_id: &str, action: &str) -> bool {
    matches!(
        (agent_id, action),
        ("project_manager", "advance_phase")
            | ("code_generator", "generate")
            | ("socratic", "generate_question")
            | ("socratic", "generate_questions_batch")
            | ("context", "extract_specifications")
            | ("conflict", "resolve")
    )
}

/// Everything an agent needs to execute one action, already validated for shape by the
/// caller; per-action required parameters are enforced at the orchestrator boundary
/// (`MissingParameter`, §4.2).
#[derive(Debug, Clone)]
pub struct ActionPayload(pub HashMap<String, serde_json::Value>);

impl ActionPayload {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::MissingParameter(key.to_string()))
    }

    pub fn require_uuid(&self, key: &str) -> Result<uuid::Uuid> {
        let raw = self.require_str(key)?;
        uuid::Uuid::parse_str(raw).map_err(|_| CoreError::Validation(format!("'{key}' is not a valid uuid")))
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }
}

impl Default for ActionPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// An agent's raw execution result before the orchestrator attaches quality validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentResult {
    pub success: bool,
    pub data: serde_json::Value,
}

/// One named agent in the closed inventory (§4.6). Thin: validates its own parameters,
/// loads bounded data, delegates to an engine/gateway, persists, returns.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &'static str;

    async fn execute(
        &self,
        action: &str,
        payload: &ActionPayload,
        identity: &Identity,
    ) -> Result<AgentResult>;

    /// Pre-validation context builder: gathers whatever `quality::pre_validate_*` needs for
    /// this `(action, payload)` without executing the agent. Returns `None` for actions the
    /// agent doesn't gate (still routed normally but pre_validate no-ops).
    async fn pre_validate(
        &self,
        _action: &str,
        _payload: &ActionPayload,
        _identity: &Identity,
    ) -> Result<PreValidation> {
        Ok(PreValidation {
            blocking: false,
            reason: None,
            issues: Vec::new(),
            path_analysis: None,
            alternatives: Vec::new(),
        })
    }

    /// Post-validation: inspect `result` and decide whether it's good enough. Default
    /// approves unconditionally (§4.5.2 "Default").
    async fn post_validate(
        &self,
        _action: &str,
        _result: &AgentResult,
        _identity: &Identity,
    ) -> Result<PostValidation> {
        Ok(crate::quality::post_validate_default())
    }
}

/// Structured block response, a first-class success-path value, never an error
/// (GLOSSARY "Blocked response").
#[derive(Debug, Clone, serde::Serialize)]
pub struct Blocked {
    pub reason: String,
    pub issues: Vec<crate::quality::Issue>,
    pub path_analysis: Option<crate::quality::PathAnalysis>,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub enum OrchestratorOutcome {
    Blocked(Blocked),
    Completed {
        result: AgentResult,
        quality_validation: Option<PostValidation>,
    },
}

/// Orchestrates a single `route` call (§4.7). Stateless aside from the per-call regeneration
/// counter; holds the closed agent registry.
pub struct Orchestrator {
    agents: HashMap<&'static str, Box<dyn Agent>>,
    regeneration_cap: u32,
}

impl Orchestrator {
    pub fn new(regeneration_cap: u32) -> Self {
        Self {
            agents: HashMap::new(),
            regeneration_cap,
        }
    }

    pub fn register(mut self, agent: Box<dyn Agent>) -> Self {
        self.agents.insert(agent.id(), agent);
        self
    }

    /// `route(agent_id, action, payload, identity)` with a deadline. `deadline` bounds the
    /// entire call including any regeneration recursion (§5, §8 scenario S6).
    pub async fn route(
        &self,
        agent_id: &str,
        action: &str,
        payload: ActionPayload,
        identity: &Identity,
        deadline: Duration,
    ) -> Result<OrchestratorOutcome> {
        let started = Instant::now();
        self.route_inner(agent_id, action, payload, identity, started, deadline, 0)
            .await
    }

    async fn route_inner(
        &self,
        agent_id: &str,
        action: &str,
        mut payload: ActionPayload,
        identity: &Identity,
        started: Instant,
        deadline: Duration,
        regeneration_count: u32,
    ) -> Result<OrchestratorOutcome> {
        if started.elapsed() >= deadline {
            return Err(CoreError::DeadlineExceeded);
        }

        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| CoreError::UnknownAgent(agent_id.to_string()))?;

        let major = is_major_operation(agent_id, action);

        if major {
            let pre = agent.pre_validate(action, &payload, identity).await?;
            if pre.blocking {
                tracing::warn!(agent_id, action, "blocked by quality pre-validation");
                return Ok(OrchestratorOutcome::Blocked(Blocked {
                    reason: pre.reason.unwrap_or_default(),
                    issues: pre.issues,
                    path_analysis: pre.path_analysis,
                    alternatives: pre.alternatives,
                }));
            }
        }

        if started.elapsed() >= deadline {
            return Err(CoreError::DeadlineExceeded);
        }

        let result = agent.execute(action, &payload, identity).await?;

        if !major {
            return Ok(OrchestratorOutcome::Completed {
                result,
                quality_validation: None,
            });
        }

        let post = agent.post_validate(action, &result, identity).await?;

        if post.action_required == Some(crate::quality::ActionRequired::Regenerate)
            && regeneration_count < self.regeneration_cap
        {
            tracing::info!(
                agent_id,
                action,
                regeneration_count,
                "regenerating after failed post-validation"
            );
            payload = payload.with("regeneration_hint", serde_json::json!(true));
            return Box::pin(self.route_inner(
                agent_id,
                action,
                payload,
                identity,
                started,
                deadline,
                regeneration_count + 1,
            ))
            .await;
        }

        if post.action_required == Some(crate::quality::ActionRequired::Regenerate) {
            tracing::warn!(agent_id, action, "regeneration cap exhausted, returning last result");
        }

        Ok(OrchestratorOutcome::Completed {
            result,
            quality_validation: Some(post),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    struct CountingAgent {
        calls: Arc<AtomicU32>,
        approve_after: u32,
    }

    #[async_trait]
    impl Agent for CountingAgent {
        fn id(&self) -> &'static str {
            "socratic"
        }

        async fn execute(
            &self,
            _action: &str,
            _payload: &ActionPayload,
            _identity: &Identity,
        ) -> Result<AgentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AgentResult {
                success: true,
                data: serde_json::json!({"text": "draft"}),
            })
        }

        async fn post_validate(
            &self,
            _action: &str,
            _result: &AgentResult,
            _identity: &Identity,
        ) -> Result<PostValidation> {
            let n = self.calls.load(Ordering::SeqCst);
            if n <= self.approve_after {
                Ok(PostValidation {
                    approved: false,
                    quality_score: 0.3,
                    issues: Vec::new(),
                    warnings: Vec::new(),
                    action_required: Some(crate::quality::ActionRequired::Regenerate),
                })
            } else {
                Ok(crate::quality::post_validate_default())
            }
        }
    }

    fn identity() -> Identity {
        Identity::new(Uuid::new_v4(), false)
    }

    #[tokio::test]
    async fn regeneration_terminates_within_cap() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = Orchestrator::new(2).register(Box::new(CountingAgent {
            calls: calls.clone(),
            approve_after: 100, // never approves -> exercises the cap
        }));

        let outcome = orchestrator
            .route(
                "socratic",
                "generate_question",
                ActionPayload::new(),
                &identity(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        // cap=2 regenerations -> 3 total executions (initial + 2 retries)
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match outcome {
            OrchestratorOutcome::Completed { quality_validation, .. } => {
                assert_eq!(quality_validation.unwrap().approved, false);
            }
            _ => panic!("expected completed outcome with last result surfaced"),
        }
    }

    #[tokio::test]
    async fn regeneration_stops_once_approved() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = Orchestrator::new(5).register(Box::new(CountingAgent {
            calls: calls.clone(),
            approve_after: 1,
        }));

        let outcome = orchestrator
            .route(
                "socratic",
                "generate_question",
                ActionPayload::new(),
                &identity(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match outcome {
            OrchestratorOutcome::Completed { quality_validation, .. } => {
                assert!(quality_validation.unwrap().approved);
            }
            _ => panic!("expected completed outcome"),
        }
    }

    #[tokio::test]
    async fn unknown_agent_errors() {
        let orchestrator = Orchestrator::new(2);
        let err = orchestrator
            .route(
                "nonexistent",
                "do_thing",
                ActionPayload::new(),
                &identity(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownAgent(_)));
    }
}
