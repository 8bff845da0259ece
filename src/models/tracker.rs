//! Active and archived progress records, keyed by verse or chapter id.

use super::{DayChange, DifficultyLevel, GameResult, ProgressRecord, SessionOutcome};
use crate::error::Error;
use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use std::collections::BTreeMap;

pub type ProgressMap = BTreeMap<String, ProgressRecord>;

/// Summary of a day-boundary pass over every active record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RolloverSummary {
    pub counters_reset: usize,
    pub streaks_broken: Vec<String>,
}

/// Every progress record the user has, split into the active set and the archive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressTracker {
    pub active: ProgressMap,
    pub archived: ProgressMap,
}

impl ProgressTracker {
    pub fn new(active: ProgressMap, archived: ProgressMap) -> Self {
        Self { active, archived }
    }

    /// Looks up an active record.
    pub fn get(&self, id: &str) -> Option<&ProgressRecord> {
        self.active.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ProgressRecord, Error> {
        self.active
            .get_mut(id)
            .ok_or_else(|| Error::NotTracked(id.to_string()))
    }

    /// Adds a freshly created record to the active set.
    pub fn track(&mut self, record: ProgressRecord) -> Result<(), Error> {
        if self.active.contains_key(&record.id) || self.archived.contains_key(&record.id) {
            return Err(Error::AlreadyTracked(record.id));
        }
        info!("tracking '{}'", record.id);
        self.active.insert(record.id.clone(), record);
        Ok(())
    }

    /// Records a finished game. Unknown ids are ignored.
    pub fn record_session(
        &mut self,
        id: &str,
        result: GameResult,
        now: NaiveDateTime,
    ) -> Option<SessionOutcome> {
        let Some(record) = self.active.get_mut(id) else {
            warn!(
                "ignoring {} session for '{}': no progress record",
                result.game_type, id
            );
            return None;
        };
        Some(record.record_session(result, now))
    }

    /// Moves an active record up one level once its quotas allow it.
    pub fn advance_level(&mut self, id: &str, today: NaiveDate) -> Result<DifficultyLevel, Error> {
        let record = self.get_mut(id)?;
        record.roll_over(today);
        let level = record.advance_level()?;
        info!("'{}' advanced to level {}", id, level);
        Ok(level)
    }

    /// Starts an active record over from level 1.
    pub fn reset(&mut self, id: &str) -> Result<(), Error> {
        self.get_mut(id)?.reset();
        info!("'{}' reset to level 1", id);
        Ok(())
    }

    /// Lowest level of `id` whose word quota is not yet met.
    pub fn first_incomplete_level(&self, id: &str) -> Result<Option<DifficultyLevel>, Error> {
        self.get(id)
            .map(ProgressRecord::first_incomplete_level)
            .ok_or_else(|| Error::NotTracked(id.to_string()))
    }

    /// Completion percentage of every level, lowest first.
    pub fn level_report(&self, id: &str) -> Result<Vec<(DifficultyLevel, f64)>, Error> {
        let record = self
            .get(id)
            .ok_or_else(|| Error::NotTracked(id.to_string()))?;
        Ok(DifficultyLevel::all()
            .map(|level| (level, record.level_completion(level)))
            .collect())
    }

    /// Applies the day boundary to every active record.
    pub fn roll_over(&mut self, today: NaiveDate) -> RolloverSummary {
        let mut summary = RolloverSummary::default();
        for (id, record) in self.active.iter_mut() {
            let DayChange {
                counter_reset,
                streak_broken,
                ..
            } = record.roll_over(today);
            if counter_reset {
                summary.counters_reset += 1;
            }
            if streak_broken {
                summary.streaks_broken.push(id.clone());
            }
        }
        summary
    }

    /// Moves an active record into the archive, keeping its progress.
    pub fn archive(&mut self, id: &str) -> Result<(), Error> {
        let record = self
            .active
            .remove(id)
            .ok_or_else(|| Error::NotTracked(id.to_string()))?;
        info!("archived '{}'", id);
        self.archived.insert(id.to_string(), record);
        Ok(())
    }

    /// Moves an archived record back into the active set as of `today`.
    pub fn restore(&mut self, id: &str, today: NaiveDate) -> Result<(), Error> {
        let mut record = self
            .archived
            .remove(id)
            .ok_or_else(|| Error::NotArchived(id.to_string()))?;
        record.roll_over(today);
        info!("restored '{}' from the archive", id);
        self.active.insert(id.to_string(), record);
        Ok(())
    }

    /// Re-derives progress and daily counters of every record, active or archived.
    pub(crate) fn normalize(&mut self, today: NaiveDate) {
        for record in self.active.values_mut().chain(self.archived.values_mut()) {
            record.normalize(today);
        }
    }

    /// Deletes a record, whether it is active or archived.
    pub fn remove(&mut self, id: &str) -> Result<ProgressRecord, Error> {
        let record = self
            .active
            .remove(id)
            .or_else(|| self.archived.remove(id))
            .ok_or_else(|| Error::NotTracked(id.to_string()))?;
        info!("removed '{}'", id);
        Ok(record)
    }
}
