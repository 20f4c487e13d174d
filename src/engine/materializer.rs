//! Care task materializer: turns a (template, optional chain step) pair plus
//! a due date into a persisted CareTask row, snapshotting the template's
//! checklist. Completing a chain-linked task is the trigger that drives the
//! progression engine; completing a standalone task from a recurring
//! template materializes the next occurrence.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::db::{task_repo, template_repo};
use crate::error::SproutError;
use crate::models::CareTask;

use super::progression::{self, ApprovalGrant, StepOutcome};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_str() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

pub fn due_in_hours(hours: i64) -> String {
    (Utc::now().naive_utc() + Duration::hours(hours))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub fn due_in_days(days: i64) -> String {
    (Utc::now().naive_utc() + Duration::days(days))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Chain provenance for a materialized task.
#[derive(Debug, Clone, Copy)]
pub struct ChainLink<'a> {
    pub assignment_id: &'a str,
    pub step_id: &'a str,
    pub step_order: i64,
}

#[derive(Debug)]
pub struct TaskCompletion {
    pub task: CareTask,
    /// Present when the task was chain-linked and advanced its assignment.
    pub step_outcome: Option<StepOutcome>,
    /// Present when a standalone recurring template scheduled its next occurrence.
    pub next_occurrence: Option<CareTask>,
}

/// Create a pending CareTask. `checklist_progress` starts as the template's
/// current checklist with every item unchecked.
pub fn materialize(
    conn: &Connection,
    plant_id: &str,
    template_id: &str,
    due_date: &str,
    link: Option<ChainLink>,
) -> Result<CareTask, SproutError> {
    let template = template_repo::get_template_by_id(conn, template_id)?;
    let checklist: BTreeMap<String, bool> = template_repo::get_checklist(conn, &template.id)?
        .into_iter()
        .map(|item| (item.id, false))
        .collect();

    let task_id = ulid::Ulid::new().to_string();
    task_repo::create_task(
        conn,
        &task_id,
        plant_id,
        &template.id,
        link.map(|l| l.assignment_id),
        link.map(|l| l.step_id),
        link.map(|l| l.step_order),
        due_date,
        &checklist,
    )
}

/// Mark a care task complete, recording any checklist check-offs first.
///
/// Chain-linked tasks route through the progression engine, which enforces
/// the current-step and approval gates and flips this task's row itself.
/// Standalone tasks from a non-one-time template schedule their next
/// occurrence at now + the template's default interval.
pub fn complete_task(
    conn: &Connection,
    task_id: &str,
    checks: &[String],
    approval: Option<&ApprovalGrant>,
) -> Result<TaskCompletion, SproutError> {
    let task = task_repo::get_task_by_id(conn, task_id)?;
    if task.completed {
        return Err(SproutError::conflict(format!(
            "Care task {} is already completed",
            task.id
        )));
    }

    if !checks.is_empty() {
        let mut checklist = task.checklist_progress.clone();
        for item_id in checks {
            match checklist.get_mut(item_id) {
                Some(state) => *state = true,
                None => {
                    return Err(SproutError::validation(format!(
                        "Unknown checklist item: {item_id}"
                    )))
                }
            }
        }
        task_repo::update_checklist(conn, &task.id, &checklist)?;
    }

    let mut step_outcome = None;
    let mut next_occurrence = None;
    match (&task.chain_assignment_id, &task.chain_step_id) {
        (Some(assignment_id), Some(step_id)) => {
            step_outcome = Some(progression::complete_step(
                conn,
                assignment_id,
                step_id,
                approval,
            )?);
        }
        _ => {
            task_repo::mark_complete(conn, &task.id)?;
            let template = template_repo::get_template_by_id(conn, &task.template_id)?;
            if !template.is_one_time {
                next_occurrence = Some(materialize(
                    conn,
                    &task.plant_id,
                    &template.id,
                    &due_in_days(template.default_interval_days),
                    None,
                )?);
            }
        }
    }

    let task = task_repo::get_task_by_id(conn, task_id)?;
    Ok(TaskCompletion {
        task,
        step_outcome,
        next_occurrence,
    })
}
