//! Prayer list: what the user is praying for, how often, and when it was answered.
use super::verse::slugify;
use crate::error::Error;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prayer {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: NaiveDate,
    pub times_prayed: u32,
    pub last_prayed: Option<NaiveDate>,
    pub answered: Option<NaiveDate>,
}

impl Prayer {
    pub fn new(title: &str, body: &str, created: NaiveDate) -> Self {
        Self {
            id: slugify(title),
            title: title.trim().to_string(),
            body: body.trim().to_string(),
            created,
            times_prayed: 0,
            last_prayed: None,
            answered: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.answered.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrayerList {
    pub prayers: BTreeMap<String, Prayer>,
}

impl PrayerList {
    pub fn add(&mut self, prayer: Prayer) -> Result<(), Error> {
        if self.prayers.contains_key(&prayer.id) {
            return Err(Error::DuplicatePrayer(prayer.id));
        }
        self.prayers.insert(prayer.id.clone(), prayer);
        Ok(())
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Prayer, Error> {
        self.prayers
            .get_mut(id)
            .ok_or_else(|| Error::UnknownPrayer(id.to_string()))
    }

    /// Counts one more time prayed; returns the new total.
    pub fn pray(&mut self, id: &str, today: NaiveDate) -> Result<u32, Error> {
        let prayer = self.get_mut(id)?;
        prayer.times_prayed += 1;
        prayer.last_prayed = Some(today);
        Ok(prayer.times_prayed)
    }

    pub fn mark_answered(&mut self, id: &str, today: NaiveDate) -> Result<(), Error> {
        self.get_mut(id)?.answered = Some(today);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Prayer, Error> {
        self.prayers
            .remove(id)
            .ok_or_else(|| Error::UnknownPrayer(id.to_string()))
    }

    /// Prayers still waiting for an answer.
    pub fn open(&self) -> impl Iterator<Item = &Prayer> {
        self.prayers.values().filter(|p| !p.is_answered())
    }
}
