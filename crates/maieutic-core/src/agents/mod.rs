// Agent inventory (§4.6). Each agent is a thin adapter: validate input, load bounded data,
// delegate to an engine or the LLM gateway, persist, return. Algorithmic work lives in
// `crate::specification`, `crate::conflict`, `crate::quality`; I/O lives here.

pub mod code_generator;
pub mod conflict;
pub mod context;
pub mod direct_chat;
pub mod project_manager;
pub mod quality;
pub mod socratic;

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::llm::DynLlmGateway;
use crate::store::{IdentityStore, WorkStore};

/// Shared handles every agent needs. Cloned cheaply (all fields are `Arc`s).
#[derive(Clone)]
pub struct AgentContext {
    pub work_store: Arc<dyn WorkStore>,
    pub identity_store: Arc<dyn IdentityStore>,
    pub gateway: Arc<DynLlmGateway>,
    pub config: Arc<CoreConfig>,
}

pub use code_generator::CodeGeneratorAgent;
pub use conflict::ConflictAgent;
pub use context::ContextAgent;
pub use direct_chat::DirectChatAgent;
pub use project_manager::ProjectManagerAgent;
pub use quality::QualityAgent;
pub use socratic::SocraticAgent;
