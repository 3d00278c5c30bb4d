// OpenAI chat/completions provider: one non-streaming round trip per `complete_once`.
// Unlike Anthropic, OpenAI's API takes a native `response_format: {type: "json_object"}`
// for structured output, so no prompt-level JSON instruction is needed here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use maieutic_contracts::error::{CoreError, Result};
use maieutic_core::llm::{CompletionRequest, CompletionResponse, CompletionUsage, LlmProvider};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Build from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CoreError::LlmProviderError("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Point at an OpenAI-compatible endpoint instead of the real API.
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: OpenAiUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let started = Instant::now();

        let body = OpenAiRequest {
            model: &request.model,
            messages: vec![
                OpenAiMessage { role: "system", content: &request.system },
                OpenAiMessage { role: "user", content: &request.user_prompt },
            ],
            max_tokens: request.max_tokens.max(1),
            temperature: request.temperature,
            response_format: request
                .json_schema
                .as_ref()
                .map(|_| ResponseFormat { r#type: "json_object" }),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
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
            return Err(CoreError::LlmUnavailable(format!("openai {status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::LlmProviderError(format!("openai {status}: {text}")));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| CoreError::LlmInvalidResponse(format!("malformed openai response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoreError::LlmInvalidResponse("openai response had no choices".to_string()))?;

        Ok(CompletionResponse {
            text,
            usage: CompletionUsage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
                total_tokens: parsed.usage.total_tokens,
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
    fn json_schema_selects_json_object_response_format() {
        let with_schema = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system: "s".to_string(),
            user_prompt: "u".to_string(),
            max_tokens: 16,
            temperature: 0.0,
            json_schema: Some(serde_json::json!({"type": "object"})),
        };
        let format = with_schema.json_schema.as_ref().map(|_| ResponseFormat { r#type: "json_object" });
        assert!(format.is_some());

        let without_schema = CompletionRequest { json_schema: None, ..with_schema };
        let format = without_schema.json_schema.as_ref().map(|_| ResponseFormat { r#type: "json_object" });
        assert!(format.is_none());
    }
}
