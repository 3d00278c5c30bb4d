use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Severity ordering for rule arbitration in the conflict engine: when
/// multiple rules fire for the same candidate, the highest-severity type
/// wins. `Ord` derives top-to-bottom declaration order, so keep this list
/// in the documented priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Resources,
    Timeline,
    Requirements,
    Technology,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConflictType::Technology => "technology",
            ConflictType::Requirements => "requirements",
            ConflictType::Timeline => "timeline",
            ConflictType::Resources => "resources",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ConflictType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "technology" => Ok(ConflictType::Technology),
            "requirements" => Ok(ConflictType::Requirements),
            "timeline" => Ok(ConflictType::Timeline),
            "resources" => Ok(ConflictType::Resources),
            other => Err(format!("unknown conflict type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Pending,
    KeepOld,
    Replace,
    Merge,
}

impl ConflictResolution {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConflictResolution::Pending)
    }
}

impl std::fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConflictResolution::Pending => "pending",
            ConflictResolution::KeepOld => "keep_old",
            ConflictResolution::Replace => "replace",
            ConflictResolution::Merge => "merge",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConflictResolution::Pending),
            "keep_old" => Ok(ConflictResolution::KeepOld),
            "replace" => Ok(ConflictResolution::Replace),
            "merge" => Ok(ConflictResolution::Merge),
            other => Err(format!("unknown conflict resolution: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conflict {
    pub id: Uuid,
    pub project_id: Uuid,
    /// The current specification this candidate disagrees with.
    pub incumbent_spec_id: Uuid,
    pub new_value: serde_json::Value,
    pub conflict_type: ConflictType,
    pub resolution: ConflictResolution,
    pub resolver: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conflict {
    pub fn is_pending(&self) -> bool {
        self.resolution == ConflictResolution::Pending
    }
}
