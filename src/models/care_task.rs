use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A concrete, due-dated task instance. Chain-originated tasks carry
/// `chain_assignment_id` + `chain_step_id` (and mirror the step's order for
/// display); standalone tasks leave them NULL. `checklist_progress` is a
/// snapshot of the template's checklist at materialization time, mapping
/// item id to checked state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareTask {
    pub id: String,
    pub plant_id: String,
    pub template_id: String,
    pub chain_assignment_id: Option<String>,
    pub chain_step_id: Option<String>,
    pub step_order: Option<i64>,
    pub due_date: String,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub checklist_progress: BTreeMap<String, bool>,
    pub created_at: String,
}
