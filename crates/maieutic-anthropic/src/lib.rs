// Anthropic Claude provider.
//
// Implements `maieutic_core::llm::LlmProvider` against Anthropic's Messages API.

mod provider;

pub use provider::AnthropicProvider;
