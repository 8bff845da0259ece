pub mod db;
pub mod storage;

pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
