use rusqlite::{params, Connection};

use crate::error::SproutError;
use crate::models::{ChecklistItem, Priority, TaskCategory, TaskTemplate};

#[allow(clippy::too_many_arguments)]
pub fn create_template(
    conn: &Connection,
    id: &str,
    name: &str,
    category: TaskCategory,
    default_interval_days: i64,
    priority: Priority,
    is_one_time: bool,
) -> Result<TaskTemplate, SproutError> {
    conn.execute(
        "INSERT INTO task_templates (id, name, category, default_interval_days, priority, is_one_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            name,
            category.as_str(),
            default_interval_days,
            priority.as_str(),
            is_one_time as i64
        ],
    )?;
    get_template_by_id(conn, id)
}

pub fn add_checklist_item(
    conn: &Connection,
    id: &str,
    template_id: &str,
    position: i64,
    text: &str,
    required: bool,
) -> Result<(), SproutError> {
    conn.execute(
        "INSERT INTO template_checklist_items (id, template_id, position, text, required)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, template_id, position, text, required as i64],
    )?;
    Ok(())
}

pub fn get_template_by_id(conn: &Connection, id: &str) -> Result<TaskTemplate, SproutError> {
    conn.query_row(
        "SELECT id, name, category, default_interval_days, priority, is_one_time,
                created_at, updated_at
         FROM task_templates WHERE id = ?1",
        params![id],
        row_to_template,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::template_not_found(id),
        _ => SproutError::from(e),
    })
}

/// Resolve a template reference: exact name → ID prefix → name partial match.
pub fn resolve_template(conn: &Connection, reference: &str) -> Result<TaskTemplate, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, default_interval_days, priority, is_one_time,
                created_at, updated_at
         FROM task_templates WHERE name = ?1",
    )?;
    let exact: Vec<TaskTemplate> = stmt
        .query_map(params![reference], row_to_template)?
        .collect::<Result<Vec<_>, _>>()?;
    match exact.len() {
        1 => return Ok(exact.into_iter().next().unwrap()),
        n if n > 1 => {
            let candidates: Vec<String> =
                exact.iter().map(|t| format!("{} ({})", t.name, t.id)).collect();
            return Err(SproutError::ambiguous_ref(reference, &candidates));
        }
        _ => {}
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, category, default_interval_days, priority, is_one_time,
                created_at, updated_at
         FROM task_templates WHERE id LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let templates: Vec<TaskTemplate> = stmt
        .query_map(params![prefix], row_to_template)?
        .collect::<Result<Vec<_>, _>>()?;
    match templates.len() {
        0 => Err(SproutError::template_not_found(reference)),
        1 => Ok(templates.into_iter().next().unwrap()),
        _ => {
            let candidates: Vec<String> = templates
                .iter()
                .map(|t| format!("{} ({})", t.name, t.id))
                .collect();
            Err(SproutError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_templates(conn: &Connection) -> Result<Vec<TaskTemplate>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, default_interval_days, priority, is_one_time,
                created_at, updated_at
         FROM task_templates ORDER BY name ASC",
    )?;
    let templates = stmt
        .query_map([], row_to_template)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(templates)
}

pub fn get_checklist(conn: &Connection, template_id: &str) -> Result<Vec<ChecklistItem>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, position, text, required
         FROM template_checklist_items WHERE template_id = ?1 ORDER BY position ASC",
    )?;
    let items = stmt
        .query_map(params![template_id], |row| {
            Ok(ChecklistItem {
                id: row.get(0)?,
                template_id: row.get(1)?,
                position: row.get(2)?,
                text: row.get(3)?,
                required: row.get::<_, i64>(4)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<TaskTemplate> {
    Ok(TaskTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        category: TaskCategory::from_str(&row.get::<_, String>(2)?).unwrap_or(TaskCategory::Check),
        default_interval_days: row.get(3)?,
        priority: Priority::from_str(&row.get::<_, String>(4)?).unwrap_or(Priority::Medium),
        is_one_time: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
