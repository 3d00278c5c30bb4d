// Anthropic Claude provider: one non-streaming Messages API round trip per `complete_once`.
// Retries, backoff, and the deadline all live in `maieutic_core::llm::LlmGateway` - this
// type only does the HTTP call and maps transport/HTTP-status failures onto `CoreError`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_core::llm::{CompletionRequest, CompletionResponse, CompletionUsage, LlmProvider};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Build from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| CoreError::LlmProviderError("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let started = Instant::now();

        let mut system = request.system.clone();
        if request.json_schema.is_some() {
            // Anthropic has no forced-JSON mode on the Messages API; ask for JSON-only prose
            // and let `LlmGateway::complete_structured`'s repair pass catch stragglers.
            system.push_str("\n\nRespond with JSON only, no surrounding prose or markdown fences.");
        }

        let body = AnthropicRequest {
            model: &request.model,
            system: &system,
            messages: vec![AnthropicMessage { role: "user", content: &request.user_prompt }],
            max_tokens: request.max_tokens.max(1),
            temperature: request.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::LlmRateLimited);
        }
        if status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::LlmUnavailable(format!("anthropic {status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::LlmProviderError(format!("anthropic {status}: {text}")));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CoreError::LlmInvalidResponse(format!("malformed anthropic response: {e}")))?;

        let text = parsed.content.into_iter().map(|b| b.text).collect::<String>();

        Ok(CompletionResponse {
            text,
            usage: CompletionUsage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
                total_tokens: parsed.usage.input_tokens + parsed.usage.output_tokens,
            },
            latency: started.elapsed(),
        })
    }
}

fn map_transport_error(err: &reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::LlmTimeout
    } else if err.is_connect() {
        CoreError::LlmUnavailable(err.to_string())
    } else {
        CoreError::LlmProviderError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_schema_requests_plain_json_instruction() {
        let request = CompletionRequest {
            model: "claude-sonnet-4-5".to_string(),
            system: "base".to_string(),
            user_prompt: "hi".to_string(),
            max_tokens: 16,
            temperature: 0.0,
            json_schema: Some(json!({"type": "object"})),
        };
        let mut system = request.system.clone();
        if request.json_schema.is_some() {
            system.push_str("\n\nRespond with JSON only, no surrounding prose or markdown fences.");
        }
        assert!(system.contains("JSON only"));
    }
}
