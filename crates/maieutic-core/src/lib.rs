// Agent Orchestration and Specification Core
//
// Key design decisions:
// - Engines (specification, conflict, quality) are pure functions over plain data records;
//   they hold no store handle and make no LLM call. Agents are thin adapters that load data,
//   call an engine, call the LLM gateway, and persist results.
// - Store access is trait-based (`store::WorkStore`, `store::IdentityStore`) so the orchestrator
//   and agents can run against an in-memory double in tests and a Postgres-backed implementation
//   (maieutic-storage) in production.
// - `BlockedByQuality` is a first-class response (`orchestrator::OrchestratorOutcome::Blocked`),
//   never an error - see quality::pre_validate.

pub mod agents;
pub mod config;
pub mod conflict;
pub mod export;
pub mod llm;
pub mod nlu;
pub mod orchestrator;
pub mod quality;
pub mod session;
pub mod specification;
pub mod store;

pub use maieutic_contracts::error::{CoreError, Result};
