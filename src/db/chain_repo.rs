use rusqlite::{params, Connection};

use crate::error::SproutError;
use crate::models::{ChainStep, TaskCategory, TaskChain};

pub fn create_chain(
    conn: &Connection,
    id: &str,
    name: &str,
    category: TaskCategory,
) -> Result<TaskChain, SproutError> {
    if find_chain_by_name(conn, name)?.is_some() {
        return Err(SproutError::chain_name_conflict(name));
    }
    conn.execute(
        "INSERT INTO task_chains (id, name, category) VALUES (?1, ?2, ?3)",
        params![id, name, category.as_str()],
    )?;
    get_chain_by_id(conn, id)
}

pub fn get_chain_by_id(conn: &Connection, id: &str) -> Result<TaskChain, SproutError> {
    conn.query_row(
        "SELECT id, name, category, is_active, created_at, updated_at
         FROM task_chains WHERE id = ?1",
        params![id],
        row_to_chain,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::chain_not_found(id),
        _ => SproutError::from(e),
    })
}

pub fn find_chain_by_name(conn: &Connection, name: &str) -> Result<Option<TaskChain>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, is_active, created_at, updated_at
         FROM task_chains WHERE name = ?1",
    )?;
    let mut rows = stmt.query(params![name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_chain(row)?)),
        None => Ok(None),
    }
}

/// Resolve a chain reference: exact name → ID prefix → name partial match.
pub fn resolve_chain(conn: &Connection, reference: &str) -> Result<TaskChain, SproutError> {
    if let Some(chain) = find_chain_by_name(conn, reference)? {
        return Ok(chain);
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, category, is_active, created_at, updated_at
         FROM task_chains WHERE id LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let chains: Vec<TaskChain> = stmt
        .query_map(params![prefix], row_to_chain)?
        .collect::<Result<Vec<_>, _>>()?;
    if chains.len() == 1 {
        return Ok(chains.into_iter().next().unwrap());
    }
    if chains.len() > 1 {
        let candidates: Vec<String> =
            chains.iter().map(|c| format!("{} ({})", c.name, c.id)).collect();
        return Err(SproutError::ambiguous_ref(reference, &candidates));
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, category, is_active, created_at, updated_at
         FROM task_chains WHERE name LIKE ?1",
    )?;
    let pattern = format!("%{reference}%");
    let chains: Vec<TaskChain> = stmt
        .query_map(params![pattern], row_to_chain)?
        .collect::<Result<Vec<_>, _>>()?;
    match chains.len() {
        0 => Err(SproutError::chain_not_found(reference)),
        1 => Ok(chains.into_iter().next().unwrap()),
        _ => {
            let candidates: Vec<String> =
                chains.iter().map(|c| format!("{} ({})", c.name, c.id)).collect();
            Err(SproutError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_chains(conn: &Connection) -> Result<Vec<TaskChain>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, is_active, created_at, updated_at
         FROM task_chains ORDER BY created_at DESC",
    )?;
    let chains = stmt
        .query_map([], row_to_chain)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(chains)
}

pub fn set_chain_active(conn: &Connection, id: &str, active: bool) -> Result<(), SproutError> {
    let changed = conn.execute(
        "UPDATE task_chains SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active as i64, id],
    )?;
    if changed == 0 {
        return Err(SproutError::chain_not_found(id));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add_step(
    conn: &Connection,
    id: &str,
    chain_id: &str,
    template_id: &str,
    step_order: i64,
    is_required: bool,
    wait_hours: i64,
    condition: Option<&str>,
    requires_approval: bool,
    approval_roles: &[String],
) -> Result<ChainStep, SproutError> {
    let roles_json = serde_json::to_string(approval_roles)
        .map_err(|e| SproutError::database(e.to_string()))?;
    conn.execute(
        "INSERT INTO chain_steps
             (id, chain_id, template_id, step_order, is_required, wait_hours,
              condition, requires_approval, approval_roles)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            chain_id,
            template_id,
            step_order,
            is_required as i64,
            wait_hours,
            condition,
            requires_approval as i64,
            roles_json
        ],
    )?;
    get_step_by_id(conn, id)
}

pub fn get_step_by_id(conn: &Connection, id: &str) -> Result<ChainStep, SproutError> {
    conn.query_row(
        "SELECT id, chain_id, template_id, step_order, is_required, wait_hours,
                condition, requires_approval, approval_roles
         FROM chain_steps WHERE id = ?1",
        params![id],
        row_to_step,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::step_not_found(id),
        _ => SproutError::from(e),
    })
}

/// Get a chain's steps in traversal sequence (ascending step_order).
pub fn get_steps(conn: &Connection, chain_id: &str) -> Result<Vec<ChainStep>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, chain_id, template_id, step_order, is_required, wait_hours,
                condition, requires_approval, approval_roles
         FROM chain_steps WHERE chain_id = ?1 ORDER BY step_order ASC",
    )?;
    let steps = stmt
        .query_map(params![chain_id], row_to_step)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(steps)
}

pub fn max_step_order(conn: &Connection, chain_id: &str) -> Result<Option<i64>, SproutError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(step_order) FROM chain_steps WHERE chain_id = ?1",
        params![chain_id],
        |row| row.get(0),
    )?;
    Ok(max)
}

fn row_to_step(row: &rusqlite::Row) -> rusqlite::Result<ChainStep> {
    let roles: Vec<String> =
        serde_json::from_str(&row.get::<_, String>(8)?).unwrap_or_default();
    Ok(ChainStep {
        id: row.get(0)?,
        chain_id: row.get(1)?,
        template_id: row.get(2)?,
        step_order: row.get(3)?,
        is_required: row.get::<_, i64>(4)? != 0,
        wait_hours: row.get(5)?,
        condition: row.get(6)?,
        requires_approval: row.get::<_, i64>(7)? != 0,
        approval_roles: roles,
    })
}

fn row_to_chain(row: &rusqlite::Row) -> rusqlite::Result<TaskChain> {
    Ok(TaskChain {
        id: row.get(0)?,
        name: row.get(1)?,
        category: TaskCategory::from_str(&row.get::<_, String>(2)?).unwrap_or(TaskCategory::Check),
        is_active: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
