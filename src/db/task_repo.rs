use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use crate::error::SproutError;
use crate::models::CareTask;

#[allow(clippy::too_many_arguments)]
pub fn create_task(
    conn: &Connection,
    id: &str,
    plant_id: &str,
    template_id: &str,
    chain_assignment_id: Option<&str>,
    chain_step_id: Option<&str>,
    step_order: Option<i64>,
    due_date: &str,
    checklist_progress: &BTreeMap<String, bool>,
) -> Result<CareTask, SproutError> {
    let checklist_json = serde_json::to_string(checklist_progress)
        .map_err(|e| SproutError::database(e.to_string()))?;
    conn.execute(
        "INSERT INTO care_tasks
             (id, plant_id, template_id, chain_assignment_id, chain_step_id,
              step_order, due_date, checklist_progress)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            plant_id,
            template_id,
            chain_assignment_id,
            chain_step_id,
            step_order,
            due_date,
            checklist_json
        ],
    )?;
    get_task_by_id(conn, id)
}

pub fn get_task_by_id(conn: &Connection, id: &str) -> Result<CareTask, SproutError> {
    conn.query_row(
        "SELECT id, plant_id, template_id, chain_assignment_id, chain_step_id,
                step_order, due_date, completed, completed_at, checklist_progress, created_at
         FROM care_tasks WHERE id = ?1",
        params![id],
        row_to_task,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::task_not_found(id),
        _ => SproutError::from(e),
    })
}

/// Resolve a care task by ID prefix.
pub fn resolve_task(conn: &Connection, reference: &str) -> Result<CareTask, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, plant_id, template_id, chain_assignment_id, chain_step_id,
                step_order, due_date, completed, completed_at, checklist_progress, created_at
         FROM care_tasks WHERE id LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let tasks: Vec<CareTask> = stmt
        .query_map(params![prefix], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    match tasks.len() {
        0 => Err(SproutError::task_not_found(reference)),
        1 => Ok(tasks.into_iter().next().unwrap()),
        _ => {
            let candidates: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
            Err(SproutError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_tasks(
    conn: &Connection,
    plant_id: Option<&str>,
    include_completed: bool,
) -> Result<Vec<CareTask>, SproutError> {
    let mut sql = String::from(
        "SELECT id, plant_id, template_id, chain_assignment_id, chain_step_id,
                step_order, due_date, completed, completed_at, checklist_progress, created_at
         FROM care_tasks WHERE 1=1",
    );
    let mut bind: Vec<&str> = Vec::new();
    if let Some(pid) = plant_id {
        sql.push_str(" AND plant_id = ?1");
        bind.push(pid);
    }
    if !include_completed {
        sql.push_str(" AND completed = 0");
    }
    sql.push_str(" ORDER BY due_date ASC");

    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(rusqlite::params_from_iter(bind), row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// The pending task materialized for one (assignment, step) pair, if any.
pub fn find_pending_chain_task(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
) -> Result<Option<CareTask>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, plant_id, template_id, chain_assignment_id, chain_step_id,
                step_order, due_date, completed, completed_at, checklist_progress, created_at
         FROM care_tasks
         WHERE chain_assignment_id = ?1 AND chain_step_id = ?2 AND completed = 0",
    )?;
    let mut rows = stmt.query(params![assignment_id, step_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_task(row)?)),
        None => Ok(None),
    }
}

pub fn mark_complete(conn: &Connection, id: &str) -> Result<(), SproutError> {
    conn.execute(
        "UPDATE care_tasks SET completed = 1, completed_at = datetime('now') WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn update_checklist(
    conn: &Connection,
    id: &str,
    checklist_progress: &BTreeMap<String, bool>,
) -> Result<(), SproutError> {
    let checklist_json = serde_json::to_string(checklist_progress)
        .map_err(|e| SproutError::database(e.to_string()))?;
    conn.execute(
        "UPDATE care_tasks SET checklist_progress = ?1 WHERE id = ?2",
        params![checklist_json, id],
    )?;
    Ok(())
}

pub fn pending_count(conn: &Connection) -> Result<i64, SproutError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM care_tasks WHERE completed = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn overdue_count(conn: &Connection, now: &str) -> Result<i64, SproutError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM care_tasks WHERE completed = 0 AND due_date < ?1",
        params![now],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<CareTask> {
    let checklist: BTreeMap<String, bool> =
        serde_json::from_str(&row.get::<_, String>(9)?).unwrap_or_default();
    Ok(CareTask {
        id: row.get(0)?,
        plant_id: row.get(1)?,
        template_id: row.get(2)?,
        chain_assignment_id: row.get(3)?,
        chain_step_id: row.get(4)?,
        step_order: row.get(5)?,
        due_date: row.get(6)?,
        completed: row.get::<_, i64>(7)? != 0,
        completed_at: row.get(8)?,
        checklist_progress: checklist,
        created_at: row.get(10)?,
    })
}
