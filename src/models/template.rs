use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Water,
    Fertilize,
    Prune,
    Check,
    Repot,
    Clean,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Fertilize => "fertilize",
            Self::Prune => "prune",
            Self::Check => "check",
            Self::Repot => "repot",
            Self::Clean => "clean",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "water" => Some(Self::Water),
            "fertilize" => Some(Self::Fertilize),
            "prune" => Some(Self::Prune),
            "check" => Some(Self::Check),
            "repot" => Some(Self::Repot),
            "clean" => Some(Self::Clean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A reusable definition of a recurring care task (watering, repotting, ...).
/// Standalone tasks materialized from a non-one-time template recur every
/// `default_interval_days` after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: String,
    pub name: String,
    pub category: TaskCategory,
    pub default_interval_days: i64,
    pub priority: Priority,
    pub is_one_time: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub template_id: String,
    pub position: i64,
    pub text: String,
    pub required: bool,
}
