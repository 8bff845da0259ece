//! SQLite persistence for the memorization app
//!
//! Everything lives in a single `app_state` key/value table: whole JSON
//! mappings under fixed keys, plus the simulated current date used when the
//! app runs on a stored clock instead of the wall clock.

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::path::Path;

const CURRENT_DATE_KEY: &str = "current_date";

/// Opens (or creates) the database file and prepares its tables.
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_tables(&conn)?;
    Ok(conn)
}

/// Creates the key/value table and seeds the simulated date with today if
/// it is not set yet.
pub fn init_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    let today = Local::now().date_naive();
    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES (?1, ?2)",
        params![CURRENT_DATE_KEY, today.to_string()],
    )?;

    Ok(())
}

/// Reads the raw value stored under `key`
pub fn get_value(key: &str, conn: &Connection) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM app_state WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

/// Inserts or replaces the value stored under `key`
pub fn set_value(key: &str, value: &str, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<NaiveDate> {
    let stored = get_value(CURRENT_DATE_KEY, conn)?;
    Ok(stored
        .and_then(|value| value.parse::<NaiveDate>().ok())
        .unwrap_or_else(|| Local::now().date_naive()))
}

/// Advances the simulated date by one day (for trying out streaks and
/// rollovers without waiting for midnight)
pub fn advance_day(conn: &Connection) -> Result<NaiveDate> {
    let current = get_current_date(conn)?;
    let next_day = current.succ_opt().unwrap_or(current);
    set_value(CURRENT_DATE_KEY, &next_day.to_string(), conn)?;
    Ok(next_day)
}
