use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Analysis,
    Design,
    Implementation,
}

impl Phase {
    /// The fixed sequence; phase advancement is monotone along this list.
    pub const SEQUENCE: [Phase; 4] = [
        Phase::Discovery,
        Phase::Analysis,
        Phase::Design,
        Phase::Implementation,
    ];

    pub fn next(self) -> Option<Phase> {
        let idx = Self::SEQUENCE.iter().position(|p| *p == self)?;
        Self::SEQUENCE.get(idx + 1).copied()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Discovery => "discovery",
            Phase::Analysis => "analysis",
            Phase::Design => "design",
            Phase::Implementation => "implementation",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Phase::Discovery),
            "analysis" => Ok(Phase::Analysis),
            "design" => Ok(Phase::Design),
            "implementation" => Ok(Phase::Implementation),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub current_phase: Phase,
    /// Recomputed by the specification engine; never hand-set. See
    /// `maieutic_core::specification::maturity`.
    pub maturity_score: f64,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
