// Shared data contracts for the Maieutic specification-gathering core.
//
// Source of truth for every entity, DTO, and the domain error taxonomy.
// Kept dependency-light so every other crate in the workspace can depend on it freely.

pub mod activity;
pub mod conflict;
pub mod error;
pub mod generated;
pub mod identity;
pub mod project;
pub mod question;
pub mod quality;
pub mod session;
pub mod specification;

pub use activity::ActivityLogEntry;
pub use conflict::{Conflict, ConflictResolution, ConflictType};
pub use error::{CoreError, Result};
pub use generated::{GeneratedFile, GeneratedProject, GeneratedProjectStatus};
pub use identity::{ApiKey, Identity, NotificationPrefs, ProjectShare, RefreshToken, ShareRole, User};
pub use project::{Phase, Project, ProjectStatus};
pub use question::{Question, QuestionGenerationMeta};
pub use quality::QualityMetric;
pub use session::{ConversationRole, ConversationTurn, Session, SessionMode, SessionStatus};
pub use specification::{
    Specification, SpecificationCandidate, SpecificationSource, MATURITY_CATEGORIES,
    PROSE_HEAVY_CATEGORIES,
};
