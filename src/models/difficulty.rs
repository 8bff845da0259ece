//! Difficulty levels 1-5. Each level fixes the games a verse is played with
//! and how many of them count towards a day.
use super::GameType;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Games required per day on a chapter, whatever its level.
pub const CHAPTER_DAILY_GAMES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const MIN: DifficultyLevel = DifficultyLevel(1);
    pub const MAX: DifficultyLevel = DifficultyLevel(5);

    pub fn new(level: u8) -> Result<Self, Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(Error::InvalidLevel(level))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every level from 1 to 5, lowest first.
    pub fn all() -> impl Iterator<Item = DifficultyLevel> {
        (Self::MIN.0..=Self::MAX.0).map(DifficultyLevel)
    }

    pub fn next(self) -> Option<Self> {
        if self < Self::MAX {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }

    pub fn is_mastery(self) -> bool {
        self == Self::MAX
    }

    /// Games a verse must finish per day at this level.
    pub fn verse_daily_games(self) -> usize {
        if self.is_mastery() { 1 } else { 3 }
    }

    /// Fixed game sequence a verse is assigned at this level.
    pub fn verse_games(self) -> Vec<GameType> {
        use GameType::*;
        match self.0 {
            1 => vec![FillBlank, WordOrder, FirstLetter],
            2 => vec![WordOrder, FirstLetter, MissingWords],
            3 => vec![FirstLetter, MissingWords, TypeAlong],
            4 => vec![MissingWords, TypeAlong, FullRecall],
            _ => vec![FullRecall],
        }
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for DifficultyLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
