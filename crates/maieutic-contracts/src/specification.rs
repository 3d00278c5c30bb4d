use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed set of 10 equally-weighted maturity categories. Changing this list is a schema
/// change, not a configuration change.
pub const MATURITY_CATEGORIES: [&str; 10] = [
    "goals",
    "requirements",
    "tech_stack",
    "scalability",
    "security",
    "testing",
    "deployment",
    "monitoring",
    "team_structure",
    "timeline",
];

/// Categories whose values are prose and therefore eligible for the
/// conflict engine's LLM-assisted semantic contradiction path.
pub const PROSE_HEAVY_CATEGORIES: [&str; 2] = ["requirements", "goals"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpecificationSource {
    UserInput,
    Extracted,
    Imported,
    Inferred,
}

impl std::fmt::Display for SpecificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpecificationSource::UserInput => "user_input",
            SpecificationSource::Extracted => "extracted",
            SpecificationSource::Imported => "imported",
            SpecificationSource::Inferred => "inferred",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SpecificationSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user_input" => Ok(SpecificationSource::UserInput),
            "extracted" => Ok(SpecificationSource::Extracted),
            "imported" => Ok(SpecificationSource::Imported),
            "inferred" => Ok(SpecificationSource::Inferred),
            other => Err(format!("unknown specification source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Specification {
    pub id: Uuid,
    pub project_id: Uuid,
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub source: SpecificationSource,
    pub is_current: bool,
    pub supersedes: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Specification {
    pub fn category_key(&self) -> (&str, &str) {
        (&self.category, &self.key)
    }
}

/// A parsed candidate from the specification engine's `extract`, not yet
/// ingested. Carries no id - ingestion assigns one only on insert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpecificationCandidate {
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub source: SpecificationSource,
}
