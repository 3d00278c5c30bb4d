// OpenAI provider.
//
// Implements `maieutic_core::llm::LlmProvider` against the chat/completions API. Also works
// against OpenAI-compatible endpoints via `with_base_url`.

mod provider;

pub use provider::OpenAiProvider;
