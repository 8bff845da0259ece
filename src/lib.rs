pub mod clock;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use models::{
    Chapter, DifficultyLevel, GameResult, GameType, Prayer, ProgressRecord, ProgressTracker,
    SessionOutcome, Verse,
};
pub use store::{Action, Event, Store};
