use serde::{Deserialize, Serialize};

use super::TaskCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChain {
    pub id: String,
    pub name: String,
    pub category: TaskCategory,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One ordered unit within a chain. `step_order` is 0-based and defines the
/// traversal sequence; `wait_hours` is applied after the previous step's
/// completion to compute this step's due date. `condition` is opaque
/// predicate data stored for external evaluation, never interpreted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStep {
    pub id: String,
    pub chain_id: String,
    pub template_id: String,
    pub step_order: i64,
    pub is_required: bool,
    pub wait_hours: i64,
    pub condition: Option<String>,
    pub requires_approval: bool,
    pub approval_roles: Vec<String>,
}
