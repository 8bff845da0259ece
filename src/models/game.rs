//! Memorization games and the sessions they produce.
use super::DifficultyLevel;
use crate::error::Error;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameType {
    FillBlank,
    WordOrder,
    FirstLetter,
    MissingWords,
    TypeAlong,
    FullRecall,
    VerseOrder,
    ChapterRecall,
}

impl GameType {
    pub const ALL: [GameType; 8] = [
        GameType::FillBlank,
        GameType::WordOrder,
        GameType::FirstLetter,
        GameType::MissingWords,
        GameType::TypeAlong,
        GameType::FullRecall,
        GameType::VerseOrder,
        GameType::ChapterRecall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GameType::FillBlank => "fill-blank",
            GameType::WordOrder => "word-order",
            GameType::FirstLetter => "first-letter",
            GameType::MissingWords => "missing-words",
            GameType::TypeAlong => "type-along",
            GameType::FullRecall => "full-recall",
            GameType::VerseOrder => "verse-order",
            GameType::ChapterRecall => "chapter-recall",
        }
    }

    /// Multi-verse games play every unlocked verse of a chapter at once.
    pub fn is_multi_verse(self) -> bool {
        matches!(self, GameType::VerseOrder | GameType::ChapterRecall)
    }

    /// Games assigned to a chapter while a single verse is unlocked.
    pub fn chapter_single_verse() -> Vec<GameType> {
        vec![GameType::FillBlank, GameType::FirstLetter]
    }

    /// Games assigned to a chapter once two or more verses are unlocked.
    pub fn chapter_multi_verse() -> Vec<GameType> {
        vec![GameType::VerseOrder, GameType::ChapterRecall]
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|game| game.name() == s)
            .ok_or_else(|| format!("unknown game '{}'", s))
    }
}

/// What a finished game reports back: which game, and how well it went.
#[derive(Clone, Copy, Debug)]
pub struct GameResult {
    pub game_type: GameType,
    /// Percentage, 0 to 100.
    pub accuracy: f64,
}

impl GameResult {
    pub fn new(game_type: GameType, accuracy: f64) -> Result<Self, Error> {
        if !(0.0..=100.0).contains(&accuracy) {
            return Err(Error::InvalidAccuracy(accuracy));
        }
        Ok(Self {
            game_type,
            accuracy,
        })
    }
}

/// A completed game, as stored on a progress record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub game_type: GameType,
    pub completed_at: NaiveDateTime,
    pub accuracy: f64,
    pub correct_words: u32,
    pub total_words: u32,
    pub difficulty: DifficultyLevel,
}

impl GameSession {
    /// Correct words are always derived from accuracy, whatever the game.
    pub fn from_result(
        result: GameResult,
        total_words: u32,
        difficulty: DifficultyLevel,
        completed_at: NaiveDateTime,
    ) -> Self {
        let correct_words = (total_words as f64 * result.accuracy / 100.0).round() as u32;
        Self {
            game_type: result.game_type,
            completed_at,
            accuracy: result.accuracy,
            correct_words: correct_words.min(total_words),
            total_words,
            difficulty,
        }
    }
}
