use rusqlite::{params, Connection};

use crate::error::SproutError;
use crate::models::{AssignmentStatus, ChainAssignment, StepApproval, StepCompletion};

pub fn create_assignment(
    conn: &Connection,
    id: &str,
    chain_id: &str,
    plant_id: &str,
    current_step_id: &str,
) -> Result<ChainAssignment, SproutError> {
    conn.execute(
        "INSERT INTO chain_assignments (id, chain_id, plant_id, current_step_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, chain_id, plant_id, current_step_id],
    )?;
    get_assignment_by_id(conn, id)
}

pub fn get_assignment_by_id(conn: &Connection, id: &str) -> Result<ChainAssignment, SproutError> {
    conn.query_row(
        "SELECT id, chain_id, plant_id, status, current_step_id, progress,
                started_at, completed_at, last_updated
         FROM chain_assignments WHERE id = ?1",
        params![id],
        row_to_assignment,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::assignment_not_found(id),
        _ => SproutError::from(e),
    })
}

/// Resolve an assignment by ID prefix (assignments have no name).
pub fn resolve_assignment(conn: &Connection, reference: &str) -> Result<ChainAssignment, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, chain_id, plant_id, status, current_step_id, progress,
                started_at, completed_at, last_updated
         FROM chain_assignments WHERE id LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let assignments: Vec<ChainAssignment> = stmt
        .query_map(params![prefix], row_to_assignment)?
        .collect::<Result<Vec<_>, _>>()?;
    match assignments.len() {
        0 => Err(SproutError::assignment_not_found(reference)),
        1 => Ok(assignments.into_iter().next().unwrap()),
        _ => {
            let candidates: Vec<String> =
                assignments.iter().map(|a| a.id.clone()).collect();
            Err(SproutError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_assignments(
    conn: &Connection,
    plant_id: Option<&str>,
) -> Result<Vec<ChainAssignment>, SproutError> {
    let (sql, bind): (&str, Vec<&str>) = match plant_id {
        Some(pid) => (
            "SELECT id, chain_id, plant_id, status, current_step_id, progress,
                    started_at, completed_at, last_updated
             FROM chain_assignments WHERE plant_id = ?1 ORDER BY started_at DESC",
            vec![pid],
        ),
        None => (
            "SELECT id, chain_id, plant_id, status, current_step_id, progress,
                    started_at, completed_at, last_updated
             FROM chain_assignments ORDER BY started_at DESC",
            vec![],
        ),
    };
    let mut stmt = conn.prepare(sql)?;
    let assignments = stmt
        .query_map(rusqlite::params_from_iter(bind), row_to_assignment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assignments)
}

/// Advance the assignment to the given step, storing the recomputed progress.
pub fn advance_to_step(
    conn: &Connection,
    id: &str,
    step_id: &str,
    progress: i64,
) -> Result<(), SproutError> {
    conn.execute(
        "UPDATE chain_assignments
         SET current_step_id = ?1, progress = ?2, last_updated = datetime('now')
         WHERE id = ?3",
        params![step_id, progress, id],
    )?;
    Ok(())
}

/// Terminal transition to `completed`: clears the current step, pins
/// completed_at. Called exactly once per assignment.
pub fn complete_assignment(conn: &Connection, id: &str) -> Result<(), SproutError> {
    conn.execute(
        "UPDATE chain_assignments
         SET status = 'completed', current_step_id = NULL, progress = 100,
             completed_at = datetime('now'), last_updated = datetime('now')
         WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Terminal transition to `cancelled`. Step completions are kept as-is.
pub fn cancel_assignment(conn: &Connection, id: &str) -> Result<(), SproutError> {
    conn.execute(
        "UPDATE chain_assignments
         SET status = 'cancelled', current_step_id = NULL, last_updated = datetime('now')
         WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn touch_assignment(conn: &Connection, id: &str) -> Result<(), SproutError> {
    conn.execute(
        "UPDATE chain_assignments SET last_updated = datetime('now') WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn add_completion(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
    position: i64,
) -> Result<(), SproutError> {
    conn.execute(
        "INSERT INTO assignment_step_completions (assignment_id, step_id, position)
         VALUES (?1, ?2, ?3)",
        params![assignment_id, step_id, position],
    )?;
    Ok(())
}

/// Completed steps of an assignment, in completion order.
pub fn get_completions(
    conn: &Connection,
    assignment_id: &str,
) -> Result<Vec<StepCompletion>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT assignment_id, step_id, position, completed_at
         FROM assignment_step_completions WHERE assignment_id = ?1 ORDER BY position ASC",
    )?;
    let completions = stmt
        .query_map(params![assignment_id], |row| {
            Ok(StepCompletion {
                assignment_id: row.get(0)?,
                step_id: row.get(1)?,
                position: row.get(2)?,
                completed_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(completions)
}

pub fn record_approval(
    conn: &Connection,
    id: &str,
    assignment_id: &str,
    step_id: &str,
    approved_by: &str,
    role: &str,
    notes: Option<&str>,
) -> Result<StepApproval, SproutError> {
    conn.execute(
        "INSERT INTO step_approvals (id, assignment_id, step_id, approved_by, role, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, assignment_id, step_id, approved_by, role, notes],
    )?;
    get_approval_by_id(conn, id)
}

pub fn get_approval_by_id(conn: &Connection, id: &str) -> Result<StepApproval, SproutError> {
    conn.query_row(
        "SELECT id, assignment_id, step_id, approved_by, role, notes, approved_at
         FROM step_approvals WHERE id = ?1",
        params![id],
        row_to_approval,
    )
    .map_err(SproutError::from)
}

/// All approvals recorded for one (assignment, step) pair.
pub fn get_step_approvals(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
) -> Result<Vec<StepApproval>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, assignment_id, step_id, approved_by, role, notes, approved_at
         FROM step_approvals WHERE assignment_id = ?1 AND step_id = ?2
         ORDER BY approved_at ASC",
    )?;
    let approvals = stmt
        .query_map(params![assignment_id, step_id], row_to_approval)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(approvals)
}

pub fn find_approval_by(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
    approved_by: &str,
) -> Result<Option<StepApproval>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, assignment_id, step_id, approved_by, role, notes, approved_at
         FROM step_approvals
         WHERE assignment_id = ?1 AND step_id = ?2 AND approved_by = ?3",
    )?;
    let mut rows = stmt.query(params![assignment_id, step_id, approved_by])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_approval(row)?)),
        None => Ok(None),
    }
}

pub fn step_has_approval(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
) -> Result<bool, SproutError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM step_approvals WHERE assignment_id = ?1 AND step_id = ?2",
        params![assignment_id, step_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn row_to_assignment(row: &rusqlite::Row) -> rusqlite::Result<ChainAssignment> {
    Ok(ChainAssignment {
        id: row.get(0)?,
        chain_id: row.get(1)?,
        plant_id: row.get(2)?,
        status: AssignmentStatus::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(AssignmentStatus::Active),
        current_step_id: row.get(4)?,
        progress: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
        last_updated: row.get(8)?,
    })
}

fn row_to_approval(row: &rusqlite::Row) -> rusqlite::Result<StepApproval> {
    Ok(StepApproval {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        step_id: row.get(2)?,
        approved_by: row.get(3)?,
        role: row.get(4)?,
        notes: row.get(5)?,
        approved_at: row.get(6)?,
    })
}
