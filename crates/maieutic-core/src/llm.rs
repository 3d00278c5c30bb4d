// LLM gateway: the single call surface described in §4.1.
//
// `LlmProvider` is the provider-specific seam (maieutic-anthropic, maieutic-openai implement
// it); `LlmGateway` wraps a provider with the retry/backoff/deadline policy so that policy is
// unit-testable against a deterministic stub provider without a network.

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use maieutic_contracts::error::{CoreError, Result};

/// Everything needed to make one completion call. Calls are pure: no database access, no
/// hidden state. Conversation memory belongs to the NLU service, not the gateway.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// When set, the provider is asked to return JSON matching this schema (structured
    /// output / forced tool call, depending on the provider).
    pub json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: CompletionUsage,
    pub latency: Duration,
}

/// Provider-specific seam. A provider implementation performs exactly one HTTP round trip
/// per call and maps transport/HTTP-status failures onto the declared error kinds; it does
/// not retry internally - that's the gateway's job.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Lets agents share one gateway behind dynamic dispatch (`LlmGateway<Box<dyn LlmProvider>>`)
/// by forwarding through the boxed trait object.
#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        (**self).complete_once(request).await
    }
}

/// Type alias for the shared, dynamically-dispatched gateway agents hold.
pub type DynLlmGateway = LlmGateway<Box<dyn LlmProvider>>;

/// Retry policy: exponential backoff with jitter, bounded by a max try count and an overall
/// deadline. Only `LlmRateLimited` and `LlmUnavailable` are retried; every other error kind
/// (including all 4xx `LlmProviderError`s) propagates on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub overall_deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            overall_deadline: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &crate::config::LlmConfig) -> Self {
        Self {
            max_tries: config.retry_max,
            base_delay: Duration::from_millis(config.retry_base_ms),
            max_delay: Duration::from_secs(5),
            overall_deadline: Duration::from_millis(config.overall_deadline_ms),
        }
    }

    /// Delay before the Nth retry (1-based: `attempt=1` is the first retry after the
    /// initial try). Exponential backoff with +/-20% jitter, capped at `max_delay`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32 - 1);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter_range = capped * 0.2;
        let jittered = if jitter_range > 0.0 {
            let offset = rand::thread_rng().gen_range(-jitter_range..jitter_range);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

/// Wraps a provider with the retry/deadline policy. This is the type agents hold.
pub struct LlmGateway<P: LlmProvider> {
    provider: P,
    policy: RetryPolicy,
}

impl<P: LlmProvider> LlmGateway<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Run one completion call, retrying on `LlmRateLimited` / `LlmUnavailable` up to
    /// `policy.max_tries` attempts total, bounded by `policy.overall_deadline`. If the
    /// deadline would already be exceeded before a retry's backoff window even starts, the
    /// call fails with `DeadlineExceeded` without touching the provider again (§8 property
    /// "S6 - Deadline across regeneration").
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if started.elapsed() >= self.policy.overall_deadline {
                return Err(CoreError::DeadlineExceeded);
            }
            let call_started = Instant::now();
            let outcome = self.provider.complete_once(&request).await;
            match outcome {
                Ok(mut response) => {
                    response.latency = call_started.elapsed();
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < self.policy.max_tries => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    if started.elapsed() + delay >= self.policy.overall_deadline {
                        return Err(CoreError::DeadlineExceeded);
                    }
                    tracing::warn!(
                        attempt,
                        ?delay,
                        "llm gateway: retrying after retryable error: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Convenience wrapper that parses the response text as JSON matching `T`, with one
    /// parse-repair pass: if the first parse fails, the request is reissued once with a
    /// stricter system-prompt suffix asking for JSON only. Beyond that, failure is
    /// `LlmInvalidResponse`, not retried further (§4.1).
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        mut request: CompletionRequest,
    ) -> Result<(T, CompletionUsage)> {
        let response = self.complete(request.clone()).await?;
        match parse_json_response::<T>(&response.text) {
            Ok(value) => Ok((value, response.usage)),
            Err(_) => {
                request.system.push_str(
                    "\n\nYour previous reply could not be parsed as JSON. Reply with JSON \
                     only, matching the requested schema exactly, no prose.",
                );
                let retry_response = self.complete(request).await?;
                let value = parse_json_response::<T>(&retry_response.text).map_err(|e| {
                    CoreError::LlmInvalidResponse(format!(
                        "response did not parse as the expected schema after one repair pass: {e}"
                    ))
                })?;
                Ok((value, retry_response.usage))
            }
        }
    }
}

fn parse_json_response<T: DeserializeOwned>(text: &str) -> std::result::Result<T, serde_json::Error> {
    // Providers sometimes wrap JSON in a prose preamble or a fenced code block; take the
    // largest {...} or [...] span if a direct parse fails.
    if let Ok(value) = serde_json::from_str::<T>(text) {
        return Ok(value);
    }
    let trimmed = extract_json_span(text).unwrap_or(text);
    serde_json::from_str::<T>(trimmed)
}

fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct StubProvider {
        calls: Arc<AtomicU32>,
        fail_times: u32,
        terminal_err: Option<fn() -> CoreError>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete_once(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                return Err(CoreError::LlmRateLimited);
            }
            if let Some(make_err) = self.terminal_err {
                return Err(make_err());
            }
            Ok(CompletionResponse {
                text: "{\"ok\":true}".to_string(),
                usage: CompletionUsage::default(),
                latency: Duration::ZERO,
            })
        }
    }

    fn req() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_string(),
            system: "sys".to_string(),
            user_prompt: "hi".to_string(),
            max_tokens: 100,
            temperature: 0.0,
            json_schema: None,
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let gateway = LlmGateway::new(
            StubProvider {
                calls: calls.clone(),
                fail_times: 2,
                terminal_err: None,
            },
            RetryPolicy {
                max_tries: 5,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                overall_deadline: Duration::from_secs(5),
            },
        );
        let response = gateway.complete(req()).await.unwrap();
        assert_eq!(response.text, "{\"ok\":true}");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_provider_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let gateway = LlmGateway::new(
            StubProvider {
                calls: calls.clone(),
                fail_times: 0,
                terminal_err: Some(|| CoreError::LlmProviderError("bad request".to_string())),
            },
            RetryPolicy::default(),
        );
        let err = gateway.complete(req()).await.unwrap_err();
        assert!(matches!(err, CoreError::LlmProviderError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_retrying_after_max_tries() {
        let calls = Arc::new(AtomicU32::new(0));
        let gateway = LlmGateway::new(
            StubProvider {
                calls: calls.clone(),
                fail_times: 100,
                terminal_err: None,
            },
            RetryPolicy {
                max_tries: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                overall_deadline: Duration::from_secs(5),
            },
        );
        let err = gateway.complete(req()).await.unwrap_err();
        assert!(matches!(err, CoreError::LlmRateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[derive(serde::Deserialize, PartialEq, Debug)]
    struct Probe {
        ok: bool,
    }

    #[tokio::test]
    async fn structured_parses_json_response() {
        let gateway = LlmGateway::new(
            StubProvider {
                calls: Arc::new(AtomicU32::new(0)),
                fail_times: 0,
                terminal_err: None,
            },
            RetryPolicy::default(),
        );
        let (value, _usage) = gateway.complete_structured::<Probe>(req()).await.unwrap();
        assert_eq!(value, Probe { ok: true });
    }
}
