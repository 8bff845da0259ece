//! JSON backup of the whole library: active and archived progress, custom
//! verses, chapters and prayers.

use crate::error::{Error, Result};
use crate::models::{Chapter, PrayerList, ProgressMap, Verse};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub progress: ProgressMap,
    #[serde(default)]
    pub archived: ProgressMap,
    #[serde(default)]
    pub verses: BTreeMap<String, Verse>,
    #[serde(default)]
    pub chapters: BTreeMap<String, Chapter>,
    #[serde(default)]
    pub prayers: PrayerList,
}

impl Backup {
    /// Checks that every record sits under its own id and that no id is both
    /// active and archived.
    pub fn validate(&self) -> Result<()> {
        for (key, record) in self.progress.iter().chain(self.archived.iter()) {
            if *key != record.id {
                return Err(Error::InvalidBackup(format!(
                    "record '{}' is stored under '{}'",
                    record.id, key
                )));
            }
        }
        if let Some(id) = self.progress.keys().find(|id| self.archived.contains_key(*id)) {
            return Err(Error::InvalidBackup(format!(
                "'{}' is both active and archived",
                id
            )));
        }
        Ok(())
    }
}

/// Writes a backup to a JSON file at the specified path.
pub fn export_json_to_path(backup: &Backup, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(backup)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(
        "exported {} active items to '{}'",
        backup.progress.len(),
        path.display()
    );
    Ok(())
}

/// Reads a backup from a JSON file.
/// Returns an error if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: &Path) -> Result<Backup> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let backup: Backup = serde_json::from_str(&contents)?;
    backup.validate()?;

    info!(
        "imported {} active items from '{}'",
        backup.progress.len(),
        path.display()
    );
    Ok(backup)
}
