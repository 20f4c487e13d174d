use std::env;
use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::error::SproutError;

use super::migrations;

/// Resolve the data directory: $SPROUT_DATA_DIR if set, else ~/.sprout.
pub fn data_dir() -> Result<PathBuf, SproutError> {
    if let Ok(dir) = env::var("SPROUT_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = env::var("HOME")
        .map_err(|_| SproutError::database("Cannot locate home directory (HOME is not set)"))?;
    Ok(PathBuf::from(home).join(".sprout"))
}

/// Get the path to the sprout database.
pub fn db_path() -> Result<PathBuf, SproutError> {
    Ok(data_dir()?.join("sprout.db"))
}

/// Open a connection to the database. Returns error if not initialized.
pub fn open_db() -> Result<Connection, SproutError> {
    let path = db_path()?;
    if !path.exists() {
        return Err(SproutError::not_initialized());
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Initialize the database: create directories, database, and run migrations.
pub fn init_db() -> Result<PathBuf, SproutError> {
    let path = db_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SproutError::database(e.to_string()))?;
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    migrations::run_migrations(&conn)?;
    Ok(path)
}

fn configure_connection(conn: &Connection) -> Result<(), SproutError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}
