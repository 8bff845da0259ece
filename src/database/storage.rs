//! Key/value storage the store persists its mappings into.
//!
//! Values are whole JSON documents; callers always read and write a full
//! mapping under one key.

use super::db;
use crate::error::Error;
use rusqlite::Connection;
use std::collections::HashMap;

pub const PROGRESS_KEY: &str = "progress";
pub const ARCHIVED_KEY: &str = "archived_progress";
pub const CUSTOM_VERSES_KEY: &str = "custom_verses";
pub const CHAPTERS_KEY: &str = "chapters";
pub const PRAYERS_KEY: &str = "prayers";
pub const LAST_ACTIVE_KEY: &str = "last_active_date";

pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, Error>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), Error>;
}

/// Storage backed by the `app_state` table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(db::get_value(key, &self.conn)?)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), Error> {
        Ok(db::set_value(key, value, &self.conn)?)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
