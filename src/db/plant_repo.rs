use rusqlite::{params, Connection};

use crate::error::SproutError;
use crate::models::Plant;

pub fn create_plant(
    conn: &Connection,
    id: &str,
    name: &str,
    species: Option<&str>,
    location: Option<&str>,
    notes: Option<&str>,
) -> Result<Plant, SproutError> {
    conn.execute(
        "INSERT INTO plants (id, name, species, location, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, name, species, location, notes],
    )?;
    get_plant_by_id(conn, id)
}

pub fn get_plant_by_id(conn: &Connection, id: &str) -> Result<Plant, SproutError> {
    conn.query_row(
        "SELECT id, name, species, location, notes, created_at, updated_at
         FROM plants WHERE id = ?1",
        params![id],
        row_to_plant,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => SproutError::plant_not_found(id),
        _ => SproutError::from(e),
    })
}

/// Resolve a plant reference: exact name → ID prefix → name partial match.
pub fn resolve_plant(conn: &Connection, reference: &str) -> Result<Plant, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, species, location, notes, created_at, updated_at
         FROM plants WHERE name = ?1",
    )?;
    let exact: Vec<Plant> = stmt
        .query_map(params![reference], row_to_plant)?
        .collect::<Result<Vec<_>, _>>()?;
    match exact.len() {
        1 => return Ok(exact.into_iter().next().unwrap()),
        n if n > 1 => {
            let candidates: Vec<String> =
                exact.iter().map(|p| format!("{} ({})", p.name, p.id)).collect();
            return Err(SproutError::ambiguous_ref(reference, &candidates));
        }
        _ => {}
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, species, location, notes, created_at, updated_at
         FROM plants WHERE id LIKE ?1",
    )?;
    let prefix = format!("{reference}%");
    let plants: Vec<Plant> = stmt
        .query_map(params![prefix], row_to_plant)?
        .collect::<Result<Vec<_>, _>>()?;
    if plants.len() == 1 {
        return Ok(plants.into_iter().next().unwrap());
    }
    if plants.len() > 1 {
        let candidates: Vec<String> =
            plants.iter().map(|p| format!("{} ({})", p.name, p.id)).collect();
        return Err(SproutError::ambiguous_ref(reference, &candidates));
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, species, location, notes, created_at, updated_at
         FROM plants WHERE name LIKE ?1",
    )?;
    let pattern = format!("%{reference}%");
    let plants: Vec<Plant> = stmt
        .query_map(params![pattern], row_to_plant)?
        .collect::<Result<Vec<_>, _>>()?;
    match plants.len() {
        0 => Err(SproutError::plant_not_found(reference)),
        1 => Ok(plants.into_iter().next().unwrap()),
        _ => {
            let candidates: Vec<String> =
                plants.iter().map(|p| format!("{} ({})", p.name, p.id)).collect();
            Err(SproutError::ambiguous_ref(reference, &candidates))
        }
    }
}

pub fn list_plants(conn: &Connection) -> Result<Vec<Plant>, SproutError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, species, location, notes, created_at, updated_at
         FROM plants ORDER BY name ASC",
    )?;
    let plants = stmt
        .query_map([], row_to_plant)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(plants)
}

/// Delete a plant. Cascades its care tasks and chain assignments.
pub fn delete_plant(conn: &Connection, id: &str) -> Result<(), SproutError> {
    let changed = conn.execute("DELETE FROM plants WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(SproutError::plant_not_found(id));
    }
    Ok(())
}

fn row_to_plant(row: &rusqlite::Row) -> rusqlite::Result<Plant> {
    Ok(Plant {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        location: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
