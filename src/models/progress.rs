//! Progress record for one verse or chapter in the active set.
//!
//! A record moves through five difficulty levels. Each day a fixed number of
//! games must be finished at the current level; finishing them extends the
//! streak and, for chapters played accurately enough, unlocks the next verse.
//! Overall progress is never stored on its own: it is recomputed from the
//! sessions every time they change.

use super::{DifficultyLevel, GameResult, GameSession, GameType, difficulty::CHAPTER_DAILY_GAMES};
use crate::error::Error;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Average accuracy a chapter day must reach before the next verse unlocks.
pub const UNLOCK_ACCURACY: f64 = 80.0;

/// Verse or chapter specific state, decided when the record is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackedItem {
    Verse { word_count: u32 },
    Chapter(ChapterUnlock),
}

/// Which verses of a chapter are open for practice. Verses unlock in order,
/// so the unlocked ones are always `0..unlocked`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChapterUnlock {
    pub verse_word_counts: Vec<u32>,
    pub unlocked: usize,
    pub mastered: BTreeSet<usize>,
    pub current_verse: usize,
}

impl ChapterUnlock {
    pub fn new(verse_word_counts: Vec<u32>) -> Self {
        Self {
            verse_word_counts,
            unlocked: 1,
            mastered: BTreeSet::new(),
            current_verse: 0,
        }
    }

    pub fn verse_count(&self) -> usize {
        self.verse_word_counts.len()
    }

    pub fn total_words(&self) -> u32 {
        self.verse_word_counts.iter().sum()
    }

    pub fn unlocked_words(&self) -> u32 {
        self.verse_word_counts.iter().take(self.unlocked).sum()
    }

    pub fn current_verse_words(&self) -> u32 {
        self.verse_word_counts
            .get(self.current_verse)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_fully_unlocked(&self) -> bool {
        self.unlocked >= self.verse_count()
    }

    /// Single-verse games until a second verse opens up.
    pub fn games(&self) -> Vec<GameType> {
        if self.unlocked >= 2 {
            GameType::chapter_multi_verse()
        } else {
            GameType::chapter_single_verse()
        }
    }

    /// Marks the current verse mastered and opens the next one.
    /// Returns the index of the newly unlocked verse, if any remained.
    fn master_current(&mut self) -> Option<usize> {
        self.mastered.insert(self.current_verse);
        if self.is_fully_unlocked() {
            return None;
        }
        self.unlocked += 1;
        self.current_verse = self.unlocked - 1;
        Some(self.current_verse)
    }
}

/// What changed when a record crossed into a new day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayChange {
    pub counter_reset: bool,
    pub streak_broken: bool,
    /// The record was last touched on a later date than `today`.
    pub clock_went_back: bool,
}

/// Result of recording a game, for the caller to show.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOutcome {
    pub id: String,
    pub completed_games_today: usize,
    pub daily_requirement: usize,
    pub day_completed: bool,
    pub streak_days: u32,
    pub overall_progress: f64,
    pub level_complete: bool,
    pub can_advance: bool,
    pub unlocked_verse: Option<usize>,
}

/// Memorization state of one tracked verse or chapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: String,
    pub item: TrackedItem,
    pub difficulty: DifficultyLevel,
    pub games_today: Vec<GameType>,
    pub completed_games_today: usize,
    pub last_reviewed: Option<NaiveDate>,
    pub review_count: u32,
    pub streak_days: u32,
    pub last_streak_date: Option<NaiveDate>,
    pub sessions: Vec<GameSession>,
    pub overall_progress: f64,
    pub total_words: u64,
    pub correct_words: u64,
    pub date_added: NaiveDate,
}

impl ProgressRecord {
    /// Starts a verse at level 1. Verses without words are rejected.
    pub fn new_verse(id: &str, word_count: u32, today: NaiveDate) -> Result<Self, Error> {
        if word_count == 0 {
            return Err(Error::EmptyText(id.to_string()));
        }
        Ok(Self::with_item(id, TrackedItem::Verse { word_count }, today))
    }

    /// Starts a chapter at level 1 with only its first verse unlocked.
    pub fn new_chapter(
        id: &str,
        verse_word_counts: Vec<u32>,
        today: NaiveDate,
    ) -> Result<Self, Error> {
        if verse_word_counts.is_empty() {
            return Err(Error::EmptyChapter(id.to_string()));
        }
        if verse_word_counts.contains(&0) {
            return Err(Error::EmptyText(id.to_string()));
        }
        let unlock = ChapterUnlock::new(verse_word_counts);
        Ok(Self::with_item(id, TrackedItem::Chapter(unlock), today))
    }

    fn with_item(id: &str, item: TrackedItem, today: NaiveDate) -> Self {
        let mut record = Self {
            id: id.to_string(),
            item,
            difficulty: DifficultyLevel::MIN,
            games_today: Vec::new(),
            completed_games_today: 0,
            last_reviewed: None,
            review_count: 0,
            streak_days: 0,
            last_streak_date: None,
            sessions: Vec::new(),
            overall_progress: 0.0,
            total_words: 0,
            correct_words: 0,
            date_added: today,
        };
        record.games_today = record.assigned_games();
        record
    }

    pub fn is_chapter(&self) -> bool {
        matches!(self.item, TrackedItem::Chapter(_))
    }

    pub fn chapter(&self) -> Option<&ChapterUnlock> {
        match &self.item {
            TrackedItem::Chapter(unlock) => Some(unlock),
            TrackedItem::Verse { .. } => None,
        }
    }

    /// Games needed today at the current level.
    pub fn daily_requirement(&self) -> usize {
        self.required_games_at(self.difficulty)
    }

    fn required_games_at(&self, level: DifficultyLevel) -> usize {
        match self.item {
            TrackedItem::Verse { .. } => level.verse_daily_games(),
            TrackedItem::Chapter(_) => CHAPTER_DAILY_GAMES,
        }
    }

    pub fn assigned_games(&self) -> Vec<GameType> {
        match &self.item {
            TrackedItem::Verse { .. } => self.difficulty.verse_games(),
            TrackedItem::Chapter(unlock) => unlock.games(),
        }
    }

    /// Words a game of this type puts in front of the player.
    pub fn words_in_play(&self, game_type: GameType) -> u32 {
        match &self.item {
            TrackedItem::Verse { word_count } => *word_count,
            TrackedItem::Chapter(unlock) if game_type.is_multi_verse() => unlock.unlocked_words(),
            TrackedItem::Chapter(unlock) => unlock.current_verse_words(),
        }
    }

    fn item_words(&self) -> u64 {
        match &self.item {
            TrackedItem::Verse { word_count } => *word_count as u64,
            TrackedItem::Chapter(unlock) => unlock.total_words() as u64,
        }
    }

    /// Words that must be answered correctly to finish a level.
    pub fn level_quota(&self, level: DifficultyLevel) -> u64 {
        self.required_games_at(level) as u64 * self.item_words()
    }

    /// Correct words credited to a level: its best sessions, as many as the
    /// level requires per day, capped at the quota.
    pub fn level_credit(&self, level: DifficultyLevel) -> u64 {
        let mut correct: Vec<u64> = self
            .sessions
            .iter()
            .filter(|s| s.difficulty == level)
            .map(|s| s.correct_words as u64)
            .collect();
        correct.sort_unstable_by(|a, b| b.cmp(a));

        let best: u64 = correct
            .into_iter()
            .take(self.required_games_at(level))
            .sum();
        best.min(self.level_quota(level))
    }

    /// Percentage of a level's quota already satisfied.
    pub fn level_completion(&self, level: DifficultyLevel) -> f64 {
        let quota = self.level_quota(level);
        if quota == 0 {
            return 0.0;
        }
        self.level_credit(level) as f64 / quota as f64 * 100.0
    }

    pub fn is_level_complete(&self, level: DifficultyLevel) -> bool {
        let quota = self.level_quota(level);
        quota > 0 && self.level_credit(level) >= quota
    }

    /// Lowest level whose quota is not yet fully satisfied.
    pub fn first_incomplete_level(&self) -> Option<DifficultyLevel> {
        DifficultyLevel::all().find(|&level| !self.is_level_complete(level))
    }

    pub fn can_advance(&self) -> bool {
        self.difficulty.next().is_some()
            && self
                .first_incomplete_level()
                .is_none_or(|level| level > self.difficulty)
    }

    fn recompute_progress(&mut self) {
        let total_quota: u64 = DifficultyLevel::all()
            .map(|level| self.level_quota(level))
            .sum();
        if total_quota == 0 {
            self.overall_progress = 0.0;
            return;
        }
        let credited: u64 = DifficultyLevel::all()
            .filter(|&level| level <= self.difficulty)
            .map(|level| self.level_credit(level))
            .sum();
        self.overall_progress = (credited as f64 / total_quota as f64 * 100.0).min(100.0);
    }

    fn sessions_today(&self, today: NaiveDate) -> impl Iterator<Item = &GameSession> {
        let level = self.difficulty;
        self.sessions
            .iter()
            .filter(move |s| s.completed_at.date() == today && s.difficulty == level)
    }

    fn average_accuracy_on(&self, today: NaiveDate) -> f64 {
        let accuracies: Vec<f64> = self.sessions_today(today).map(|s| s.accuracy).collect();
        if accuracies.is_empty() {
            return 0.0;
        }
        accuracies.iter().sum::<f64>() / accuracies.len() as f64
    }

    /// Brings the record into `today`: clears a stale daily counter and breaks
    /// a streak that skipped a day.
    pub fn roll_over(&mut self, today: NaiveDate) -> DayChange {
        let mut change = DayChange::default();

        let latest = self.last_reviewed.max(self.last_streak_date);
        if let Some(latest) = latest
            && latest > today
        {
            warn!(
                "'{}' was last active on {}, after today ({}); keeping its streak",
                self.id, latest, today
            );
            change.clock_went_back = true;
        }

        if self.last_reviewed != Some(today) {
            change.counter_reset = self.completed_games_today > 0;
            self.completed_games_today = 0;
            self.games_today = self.assigned_games();
        }

        if let Some(last) = self.last_streak_date
            && (today - last).num_days() > 1
        {
            debug!(
                "'{}' streak of {} days broken (last kept {})",
                self.id, self.streak_days, last
            );
            self.streak_days = 0;
            self.last_streak_date = None;
            change.streak_broken = true;
        }

        change
    }

    /// Re-derives the fields computed from sessions, for records that come
    /// from outside the tracker.
    pub(crate) fn normalize(&mut self, today: NaiveDate) {
        self.recompute_progress();
        let requirement = self.daily_requirement();
        self.completed_games_today = self.sessions_today(today).count().min(requirement);
    }

    fn update_streak(&mut self, today: NaiveDate) {
        match self.last_streak_date {
            Some(last) if last == today => {}
            Some(last) if last.succ_opt() == Some(today) => self.streak_days += 1,
            _ => self.streak_days = 1,
        }
        self.last_streak_date = Some(today);
    }

    /// Appends a finished game and re-evaluates the day, the streak and,
    /// for chapters, the unlock sequence.
    pub fn record_session(&mut self, result: GameResult, now: NaiveDateTime) -> SessionOutcome {
        let today = now.date();
        self.roll_over(today);

        let requirement = self.daily_requirement();
        let before = self.completed_games_today;

        let total_words = self.words_in_play(result.game_type);
        let session = GameSession::from_result(result, total_words, self.difficulty, now);
        debug!(
            "'{}' {} at level {}: {}/{} words",
            self.id, session.game_type, self.difficulty, session.correct_words, session.total_words
        );

        self.review_count += 1;
        self.total_words += session.total_words as u64;
        self.correct_words += session.correct_words as u64;
        self.last_reviewed = Some(today);
        self.sessions.push(session);

        self.completed_games_today = self.sessions_today(today).count().min(requirement);
        self.recompute_progress();

        let day_completed = before < requirement && self.completed_games_today == requirement;
        let mut unlocked_verse = None;
        if day_completed {
            self.update_streak(today);
            info!("'{}' finished its games for {} (streak {})", self.id, today, self.streak_days);

            if self.is_chapter() {
                unlocked_verse = self.try_unlock_next_verse(today);
            }
        }

        SessionOutcome {
            id: self.id.clone(),
            completed_games_today: self.completed_games_today,
            daily_requirement: requirement,
            day_completed,
            streak_days: self.streak_days,
            overall_progress: self.overall_progress,
            level_complete: self.is_level_complete(self.difficulty),
            can_advance: self.can_advance(),
            unlocked_verse,
        }
    }

    fn try_unlock_next_verse(&mut self, today: NaiveDate) -> Option<usize> {
        let average = self.average_accuracy_on(today);
        if average < UNLOCK_ACCURACY {
            debug!(
                "'{}' averaged {:.0}% today, below {:.0}% needed to unlock",
                self.id, average, UNLOCK_ACCURACY
            );
            return None;
        }

        let TrackedItem::Chapter(unlock) = &mut self.item else {
            return None;
        };
        let unlocked = unlock.master_current();
        if let Some(index) = unlocked {
            info!("'{}' unlocked verse {}", self.id, index + 1);
        }
        self.games_today = self.assigned_games();
        unlocked
    }

    /// Moves up one difficulty level. Refused while this or any earlier level
    /// is short of its quota.
    pub fn advance_level(&mut self) -> Result<DifficultyLevel, Error> {
        let next = self
            .difficulty
            .next()
            .ok_or_else(|| Error::MaxLevel(self.id.clone()))?;

        if let Some(level) = self.first_incomplete_level()
            && level <= self.difficulty
        {
            return Err(Error::LevelIncomplete {
                id: self.id.clone(),
                level,
            });
        }

        self.difficulty = next;
        self.completed_games_today = 0;
        self.games_today = self.assigned_games();
        self.recompute_progress();
        Ok(next)
    }

    /// Starts the record over from level 1, keeping only what it tracks.
    pub fn reset(&mut self) {
        let item = match &self.item {
            TrackedItem::Verse { word_count } => TrackedItem::Verse {
                word_count: *word_count,
            },
            TrackedItem::Chapter(unlock) => {
                TrackedItem::Chapter(ChapterUnlock::new(unlock.verse_word_counts.clone()))
            }
        };
        *self = Self::with_item(&self.id, item, self.date_added);
    }
}
