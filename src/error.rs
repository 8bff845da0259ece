//! Error type shared by the tracker, the store and the storage backends.

use crate::models::DifficultyLevel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no progress record for '{0}'")]
    NotTracked(String),

    #[error("'{0}' is already in the active set")]
    AlreadyTracked(String),

    #[error("'{0}' is not in the archive")]
    NotArchived(String),

    #[error("'{0}' is already at the highest difficulty level")]
    MaxLevel(String),

    #[error("level {level} of '{id}' is not complete yet")]
    LevelIncomplete { id: String, level: DifficultyLevel },

    #[error("unknown prayer '{0}'")]
    UnknownPrayer(String),

    #[error("prayer '{0}' already exists")]
    DuplicatePrayer(String),

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("chapter '{0}' has no verses")]
    EmptyChapter(String),

    #[error("'{0}' has no words to memorize")]
    EmptyText(String),

    #[error("accuracy must be between 0 and 100, got {0}")]
    InvalidAccuracy(f64),

    #[error("difficulty level must be between 1 and 5, got {0}")]
    InvalidLevel(u8),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
