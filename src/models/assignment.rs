use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A chain bound to one plant, tracking live progress through the chain's
/// steps. `current_step_id` is the step awaiting completion and is NULL once
/// the assignment reaches a terminal status. `progress` is the derived
/// integer percentage of completed steps, never set independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAssignment {
    pub id: String,
    pub chain_id: String,
    pub plant_id: String,
    pub status: AssignmentStatus,
    pub current_step_id: Option<String>,
    pub progress: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub last_updated: String,
}

/// Append-only record of one completed step within an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletion {
    pub assignment_id: String,
    pub step_id: String,
    pub position: i64,
    pub completed_at: String,
}

/// A single recorded approval event for a gated step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepApproval {
    pub id: String,
    pub assignment_id: String,
    pub step_id: String,
    pub approved_by: String,
    pub role: String,
    pub notes: Option<String>,
    pub approved_at: String,
}
