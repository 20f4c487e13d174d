use serde_json::{json, Value};

use crate::error::SproutError;
use crate::models::{
    CareTask, ChainAssignment, ChainStep, ChecklistItem, Plant, StepApproval, StepCompletion,
    TaskChain, TaskTemplate,
};

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

pub fn error(err: &SproutError) -> Value {
    json!({
        "success": false,
        "error": {
            "code": err.code.as_str(),
            "message": err.message
        }
    })
}

pub fn plant_json(p: &Plant) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "species": p.species,
        "location": p.location,
        "notes": p.notes,
        "created_at": p.created_at,
        "updated_at": p.updated_at
    })
}

pub fn template_json(t: &TaskTemplate, checklist: &[ChecklistItem]) -> Value {
    let items: Vec<Value> = checklist
        .iter()
        .map(|i| {
            json!({
                "id": i.id,
                "position": i.position,
                "text": i.text,
                "required": i.required
            })
        })
        .collect();
    json!({
        "id": t.id,
        "name": t.name,
        "category": t.category.as_str(),
        "default_interval_days": t.default_interval_days,
        "priority": t.priority.as_str(),
        "is_one_time": t.is_one_time,
        "checklist": items
    })
}

pub fn template_summary(t: &TaskTemplate) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "category": t.category.as_str(),
        "default_interval_days": t.default_interval_days,
        "priority": t.priority.as_str(),
        "is_one_time": t.is_one_time
    })
}

pub fn chain_json(c: &TaskChain, steps: &[ChainStep]) -> Value {
    let steps_json: Vec<Value> = steps.iter().map(step_json).collect();
    json!({
        "id": c.id,
        "name": c.name,
        "category": c.category.as_str(),
        "is_active": c.is_active,
        "steps": steps_json
    })
}

pub fn chain_summary(c: &TaskChain, step_count: usize) -> Value {
    json!({
        "id": c.id,
        "name": c.name,
        "category": c.category.as_str(),
        "is_active": c.is_active,
        "step_count": step_count
    })
}

pub fn step_json(s: &ChainStep) -> Value {
    json!({
        "id": s.id,
        "template_id": s.template_id,
        "order": s.step_order,
        "is_required": s.is_required,
        "wait_hours": s.wait_hours,
        "condition": s.condition,
        "requires_approval": s.requires_approval,
        "approval_roles": s.approval_roles
    })
}

pub fn assignment_json(a: &ChainAssignment, completed_steps: &[StepCompletion]) -> Value {
    let completed: Vec<Value> = completed_steps
        .iter()
        .map(|c| {
            json!({
                "step_id": c.step_id,
                "position": c.position,
                "completed_at": c.completed_at
            })
        })
        .collect();
    json!({
        "id": a.id,
        "chain_id": a.chain_id,
        "plant_id": a.plant_id,
        "status": a.status.as_str(),
        "current_step_id": a.current_step_id,
        "progress": a.progress,
        "completed_steps": completed,
        "started_at": a.started_at,
        "completed_at": a.completed_at,
        "last_updated": a.last_updated
    })
}

pub fn assignment_summary(a: &ChainAssignment) -> Value {
    json!({
        "id": a.id,
        "chain_id": a.chain_id,
        "plant_id": a.plant_id,
        "status": a.status.as_str(),
        "progress": a.progress
    })
}

pub fn approval_json(ap: &StepApproval) -> Value {
    json!({
        "id": ap.id,
        "assignment_id": ap.assignment_id,
        "step_id": ap.step_id,
        "approved_by": ap.approved_by,
        "role": ap.role,
        "notes": ap.notes,
        "approved_at": ap.approved_at
    })
}

pub fn task_json(t: &CareTask) -> Value {
    json!({
        "id": t.id,
        "plant_id": t.plant_id,
        "template_id": t.template_id,
        "chain_assignment_id": t.chain_assignment_id,
        "chain_step_id": t.chain_step_id,
        "step_order": t.step_order,
        "due_date": t.due_date,
        "completed": t.completed,
        "completed_at": t.completed_at,
        "checklist_progress": t.checklist_progress
    })
}

pub fn schedule_entry(t: &CareTask, plant_name: &str, template_name: &str, overdue: bool) -> Value {
    json!({
        "task_id": t.id,
        "plant": plant_name,
        "template": template_name,
        "due_date": t.due_date,
        "overdue": overdue,
        "from_chain": t.chain_assignment_id.is_some()
    })
}
