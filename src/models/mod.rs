pub mod difficulty;
pub mod game;
pub mod prayer;
pub mod progress;
pub mod tracker;
pub mod verse;

pub use difficulty::DifficultyLevel;
pub use game::{GameResult, GameSession, GameType};
pub use prayer::{Prayer, PrayerList};
pub use progress::{ChapterUnlock, DayChange, ProgressRecord, SessionOutcome, TrackedItem};
pub use tracker::{ProgressMap, ProgressTracker, RolloverSummary};
pub use verse::{Chapter, Verse};
