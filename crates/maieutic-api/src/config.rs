// Server configuration, assembled from environment variables plus bundled defaults,
// following the common `Config::from_env()` constructor pattern.

use std::time::Duration;

use maieutic_core::config::{BiasConfig, CoreConfig, PathOptimizerConfig, QualityConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderChoice {
    Anthropic,
    OpenAi,
}

pub struct Config {
    pub bind_addr: String,
    /// `None` runs against the in-memory store double instead of Postgres - useful for
    /// local exploration without a database (§B.4's in-memory test double doubles as this).
    pub database_url: Option<String>,
    pub llm_provider: LlmProviderChoice,
    pub core: CoreConfig,
    /// Wall-clock budget handed to every `Orchestrator::route` call (§5).
    pub route_deadline: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Load a config table override from a JSON file if the given env var points at one,
/// otherwise keep the bundled default (§6 "Configuration surface" - tables, not code).
fn load_table_override<T: serde::de::DeserializeOwned>(env_var: &str, default: T) -> T {
    match std::env::var(env_var) {
        Ok(path) => match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(path, %err, "failed to parse config override, using bundled default");
                    default
                }
            },
            Err(err) => {
                tracing::warn!(path, %err, "failed to read config override file, using bundled default");
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut core = CoreConfig::default();
        core.llm.model = env_or("LLM_MODEL", &core.llm.model);
        core.llm.max_tokens_default = env_parse("LLM_MAX_TOKENS_DEFAULT", core.llm.max_tokens_default);
        core.llm.timeout_ms = env_parse("LLM_TIMEOUT_MS", core.llm.timeout_ms);
        core.llm.retry_max = env_parse("LLM_RETRY_MAX", core.llm.retry_max);
        core.llm.retry_base_ms = env_parse("LLM_RETRY_BASE_MS", core.llm.retry_base_ms);
        core.conversation_buffer_size = env_parse("CONVERSATION_BUFFER_SIZE", core.conversation_buffer_size);
        core.merge_requires_editor = env_parse("MERGE_REQUIRES_EDITOR", core.merge_requires_editor);

        core.quality = load_table_override::<QualityConfig>("QUALITY_THRESHOLDS_PATH", core.quality);
        core.bias = load_table_override::<BiasConfig>("BIAS_CONFIG_PATH", core.bias);
        core.path_optimizer =
            load_table_override::<PathOptimizerConfig>("PATH_OPTIMIZER_CONFIG_PATH", core.path_optimizer);

        let llm_provider = match env_or("LLM_PROVIDER", "anthropic").as_str() {
            "openai" => LlmProviderChoice::OpenAi,
            _ => LlmProviderChoice::Anthropic,
        };

        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            database_url: std::env::var("DATABASE_URL").ok(),
            llm_provider,
            core,
            route_deadline: Duration::from_millis(env_parse("ROUTE_DEADLINE_MS", 30_000u64)),
        }
    }
}
