//! Application store: owns the progress tracker, the verse library and the
//! prayer list, applies actions to them and writes the changed mappings back
//! to storage.
//!
//! The day boundary is checked at the start of every `dispatch`: when the
//! clock has moved past the last active date, every record is rolled over
//! before the action runs. Persistence failures are logged and otherwise
//! ignored; the in-memory state stays authoritative until the next
//! successful write.

use crate::clock::Clock;
use crate::database::KeyValueStore;
use crate::database::storage::{
    ARCHIVED_KEY, CHAPTERS_KEY, CUSTOM_VERSES_KEY, LAST_ACTIVE_KEY, PRAYERS_KEY, PROGRESS_KEY,
};
use crate::error::Result;
use crate::export::Backup;
use crate::models::{
    Chapter, DifficultyLevel, GameResult, Prayer, PrayerList, ProgressRecord, ProgressTracker,
    RolloverSummary, SessionOutcome, Verse,
};
use chrono::NaiveDate;
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub enum Action {
    AddVerse(Verse),
    AddChapter(Chapter),
    RecordSession { id: String, result: GameResult },
    AdvanceLevel { id: String },
    Reset { id: String },
    Archive { id: String },
    Restore { id: String },
    Remove { id: String },
    RollOver,
    AddPrayer { title: String, body: String },
    Pray { id: String },
    MarkAnswered { id: String },
    RemovePrayer { id: String },
    Import(Backup),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ItemAdded { id: String },
    SessionRecorded(SessionOutcome),
    SessionSkipped { id: String },
    LevelAdvanced { id: String, level: DifficultyLevel },
    ProgressReset { id: String },
    Archived { id: String },
    Restored { id: String },
    Removed { id: String },
    DayRolledOver { today: NaiveDate, summary: RolloverSummary },
    PrayerAdded { id: String },
    Prayed { id: String, times: u32 },
    PrayerAnswered { id: String },
    PrayerRemoved { id: String },
    Imported { items: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Event)>;

/// Whole mappings the store keeps under their own storage key.
#[derive(Clone, Copy, Debug)]
enum Mapping {
    Progress,
    Archived,
    Verses,
    Chapters,
    Prayers,
    LastActive,
}

impl Mapping {
    fn key(self) -> &'static str {
        match self {
            Mapping::Progress => PROGRESS_KEY,
            Mapping::Archived => ARCHIVED_KEY,
            Mapping::Verses => CUSTOM_VERSES_KEY,
            Mapping::Chapters => CHAPTERS_KEY,
            Mapping::Prayers => PRAYERS_KEY,
            Mapping::LastActive => LAST_ACTIVE_KEY,
        }
    }
}

pub struct Store<S: KeyValueStore, C: Clock> {
    storage: S,
    clock: C,
    tracker: ProgressTracker,
    verses: BTreeMap<String, Verse>,
    chapters: BTreeMap<String, Chapter>,
    prayers: PrayerList,
    last_active: Option<NaiveDate>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

fn read_key<T, S>(storage: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore,
{
    match storage.read(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

impl<S: KeyValueStore, C: Clock> Store<S, C> {
    /// Loads every mapping from storage. Missing keys start out empty.
    pub fn load(storage: S, clock: C) -> Result<Self> {
        let active = read_key(&storage, PROGRESS_KEY)?.unwrap_or_default();
        let archived = read_key(&storage, ARCHIVED_KEY)?.unwrap_or_default();
        let verses = read_key(&storage, CUSTOM_VERSES_KEY)?.unwrap_or_default();
        let chapters = read_key(&storage, CHAPTERS_KEY)?.unwrap_or_default();
        let prayers = read_key(&storage, PRAYERS_KEY)?.unwrap_or_default();
        let last_active = read_key::<Option<NaiveDate>, _>(&storage, LAST_ACTIVE_KEY)?.flatten();

        let store = Self {
            storage,
            clock,
            tracker: ProgressTracker::new(active, archived),
            verses,
            chapters,
            prayers,
            last_active,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        info!(
            "loaded {} active and {} archived items",
            store.tracker.active.len(),
            store.tracker.archived.len()
        );
        Ok(store)
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn record(&self, id: &str) -> Option<&ProgressRecord> {
        self.tracker.get(id)
    }

    pub fn verses(&self) -> &BTreeMap<String, Verse> {
        &self.verses
    }

    pub fn chapters(&self) -> &BTreeMap<String, Chapter> {
        &self.chapters
    }

    pub fn prayers(&self) -> &PrayerList {
        &self.prayers
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Human readable reference for a tracked id, falling back to the id.
    pub fn reference<'a>(&'a self, id: &'a str) -> &'a str {
        self.verses
            .get(id)
            .map(|v| v.reference.as_str())
            .or_else(|| self.chapters.get(id).map(|c| c.reference.as_str()))
            .unwrap_or(id)
    }

    pub fn backup(&self) -> Backup {
        Backup {
            progress: self.tracker.active.clone(),
            archived: self.tracker.archived.clone(),
            verses: self.verses.clone(),
            chapters: self.chapters.clone(),
            prayers: self.prayers.clone(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &Event) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    /// Applies one action, persists what it changed and notifies listeners.
    pub fn dispatch(&mut self, action: Action) -> Result<Event> {
        if !matches!(action, Action::RollOver) {
            self.check_day_boundary();
        }

        let today = self.clock.today();
        let event = self.apply(action, today)?;
        self.emit(&event);
        Ok(event)
    }

    /// Rolls every record over if the clock has left the last active day.
    /// Readers call this before showing state; `dispatch` does it itself.
    pub fn check_day_boundary(&mut self) -> Option<Event> {
        let today = self.clock.today();
        if self.last_active == Some(today) {
            return None;
        }
        let event = self.roll_over(today);
        self.emit(&event);
        Some(event)
    }

    fn roll_over(&mut self, today: NaiveDate) -> Event {
        let summary = self.tracker.roll_over(today);
        info!(
            "day rolled over to {}: {} counters reset, {} streaks broken",
            today,
            summary.counters_reset,
            summary.streaks_broken.len()
        );
        self.last_active = Some(today);
        self.persist(&[Mapping::Progress, Mapping::LastActive]);
        Event::DayRolledOver { today, summary }
    }

    fn apply(&mut self, action: Action, today: NaiveDate) -> Result<Event> {
        let event = match action {
            Action::AddVerse(verse) => {
                let record = ProgressRecord::new_verse(&verse.id, verse.word_count(), today)?;
                self.tracker.track(record)?;
                let id = verse.id.clone();
                self.verses.insert(id.clone(), verse);
                self.persist(&[Mapping::Verses, Mapping::Progress]);
                Event::ItemAdded { id }
            }
            Action::AddChapter(chapter) => {
                let record =
                    ProgressRecord::new_chapter(&chapter.id, chapter.verse_word_counts(), today)?;
                self.tracker.track(record)?;
                let id = chapter.id.clone();
                self.chapters.insert(id.clone(), chapter);
                self.persist(&[Mapping::Chapters, Mapping::Progress]);
                Event::ItemAdded { id }
            }
            Action::RecordSession { id, result } => {
                match self.tracker.record_session(&id, result, self.clock.now()) {
                    Some(outcome) => {
                        self.persist(&[Mapping::Progress]);
                        Event::SessionRecorded(outcome)
                    }
                    None => Event::SessionSkipped { id },
                }
            }
            Action::AdvanceLevel { id } => {
                let level = self.tracker.advance_level(&id, today)?;
                self.persist(&[Mapping::Progress]);
                Event::LevelAdvanced { id, level }
            }
            Action::Reset { id } => {
                self.tracker.reset(&id)?;
                self.persist(&[Mapping::Progress]);
                Event::ProgressReset { id }
            }
            Action::Archive { id } => {
                self.tracker.archive(&id)?;
                self.persist(&[Mapping::Progress, Mapping::Archived]);
                Event::Archived { id }
            }
            Action::Restore { id } => {
                self.tracker.restore(&id, today)?;
                self.persist(&[Mapping::Progress, Mapping::Archived]);
                Event::Restored { id }
            }
            Action::Remove { id } => {
                self.tracker.remove(&id)?;
                self.persist(&[Mapping::Progress, Mapping::Archived]);
                Event::Removed { id }
            }
            Action::RollOver => self.roll_over(today),
            Action::AddPrayer { title, body } => {
                let prayer = Prayer::new(&title, &body, today);
                let id = prayer.id.clone();
                self.prayers.add(prayer)?;
                self.persist(&[Mapping::Prayers]);
                Event::PrayerAdded { id }
            }
            Action::Pray { id } => {
                let times = self.prayers.pray(&id, today)?;
                self.persist(&[Mapping::Prayers]);
                Event::Prayed { id, times }
            }
            Action::MarkAnswered { id } => {
                self.prayers.mark_answered(&id, today)?;
                self.persist(&[Mapping::Prayers]);
                Event::PrayerAnswered { id }
            }
            Action::RemovePrayer { id } => {
                self.prayers.remove(&id)?;
                self.persist(&[Mapping::Prayers]);
                Event::PrayerRemoved { id }
            }
            Action::Import(backup) => {
                backup.validate()?;
                let items = backup.progress.len();
                self.tracker = ProgressTracker::new(backup.progress, backup.archived);
                self.tracker.roll_over(today);
                self.tracker.normalize(today);
                self.verses = backup.verses;
                self.chapters = backup.chapters;
                self.prayers = backup.prayers;
                self.persist(&[
                    Mapping::Progress,
                    Mapping::Archived,
                    Mapping::Verses,
                    Mapping::Chapters,
                    Mapping::Prayers,
                ]);
                Event::Imported { items }
            }
        };
        Ok(event)
    }

    fn persist(&mut self, mappings: &[Mapping]) {
        for &mapping in mappings {
            if let Err(e) = self.write_mapping(mapping) {
                error!("failed to save '{}': {}", mapping.key(), e);
            }
        }
    }

    fn write_mapping(&mut self, mapping: Mapping) -> Result<()> {
        let json = match mapping {
            Mapping::Progress => serde_json::to_string(&self.tracker.active)?,
            Mapping::Archived => serde_json::to_string(&self.tracker.archived)?,
            Mapping::Verses => serde_json::to_string(&self.verses)?,
            Mapping::Chapters => serde_json::to_string(&self.chapters)?,
            Mapping::Prayers => serde_json::to_string(&self.prayers)?,
            Mapping::LastActive => serde_json::to_string(&self.last_active)?,
        };
        self.storage.write(mapping.key(), &json)?;
        debug!("saved '{}' ({} bytes)", mapping.key(), json.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::Error;
    use crate::database::MemoryStore;
    use crate::models::GameType;
    use chrono::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn start() -> FixedClock {
        FixedClock::on(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap())
    }

    fn john_3_16() -> Verse {
        Verse::new(
            "John 3:16",
            "For God so loved the world, that he gave his only begotten Son",
            "KJV",
        )
    }

    fn play(id: &str, game: GameType, accuracy: f64) -> Action {
        Action::RecordSession {
            id: id.to_string(),
            result: GameResult::new(game, accuracy).unwrap(),
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_add_verse_persists_library_and_progress() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();

        let event = store.dispatch(Action::AddVerse(john_3_16())).unwrap();

        assert_eq!(event, Event::ItemAdded { id: "john-3-16".to_string() });
        assert!(store.storage().read(PROGRESS_KEY).unwrap().unwrap().contains("john-3-16"));
        assert!(store.storage().read(CUSTOM_VERSES_KEY).unwrap().is_some());
        assert_eq!(store.reference("john-3-16"), "John 3:16");
    }

    #[test]
    fn test_state_survives_reload() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();
        store.dispatch(play("john-3-16", GameType::FillBlank, 90.0)).unwrap();

        let storage = store.storage;
        let reloaded = Store::load(storage, &clock).unwrap();

        let record = reloaded.record("john-3-16").unwrap();
        assert_eq!(record.sessions.len(), 1);
        assert_eq!(record.completed_games_today, 1);
    }

    #[test]
    fn test_first_dispatch_of_a_new_day_rolls_over() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();
        store.dispatch(play("john-3-16", GameType::FillBlank, 100.0)).unwrap();

        clock.advance(Duration::days(1));
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = events.clone();
        store.subscribe(move |event| seen.borrow_mut().push(event.clone()));

        store.dispatch(play("john-3-16", GameType::WordOrder, 100.0)).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::DayRolledOver { .. }));
        assert_eq!(store.record("john-3-16").unwrap().completed_games_today, 1);
    }

    #[test]
    fn test_day_boundary_checked_once_per_day() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();

        assert!(store.check_day_boundary().is_some());
        assert!(store.check_day_boundary().is_none());

        clock.advance(Duration::hours(13));
        assert!(store.check_day_boundary().is_some());
        assert_eq!(
            store.storage().read(LAST_ACTIVE_KEY).unwrap().as_deref(),
            Some("\"2024-09-03\"")
        );
    }

    #[test]
    fn test_explicit_rollover_breaks_old_streak() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();
        for game in [GameType::FillBlank, GameType::WordOrder, GameType::FirstLetter] {
            store.dispatch(play("john-3-16", game, 100.0)).unwrap();
        }
        assert_eq!(store.record("john-3-16").unwrap().streak_days, 1);

        clock.advance(Duration::days(2));
        let event = store.dispatch(Action::RollOver).unwrap();

        match event {
            Event::DayRolledOver { summary, .. } => {
                assert_eq!(summary.streaks_broken, vec!["john-3-16".to_string()])
            }
            other => panic!("expected a rollover, got {:?}", other),
        }
        let record = store.record("john-3-16").unwrap();
        assert_eq!(record.streak_days, 0);
        assert_eq!(record.last_streak_date, None);
    }

    #[test]
    fn test_session_for_unknown_id_is_skipped() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();

        let event = store.dispatch(play("nowhere-1-1", GameType::FillBlank, 100.0)).unwrap();

        assert_eq!(event, Event::SessionSkipped { id: "nowhere-1-1".to_string() });
        assert!(store.storage().read(PROGRESS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_write_failures_keep_memory_state() {
        let clock = start();
        let mut store = Store::load(FailingStore, &clock).unwrap();

        store.dispatch(Action::AddVerse(john_3_16())).unwrap();
        let event = store.dispatch(play("john-3-16", GameType::FillBlank, 100.0)).unwrap();

        assert!(matches!(event, Event::SessionRecorded(_)));
        assert_eq!(store.record("john-3-16").unwrap().review_count, 1);
    }

    #[test]
    fn test_blocked_advance_is_an_error() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();

        let result = store.dispatch(Action::AdvanceLevel { id: "john-3-16".to_string() });

        assert!(matches!(result, Err(Error::LevelIncomplete { .. })));
        assert_eq!(store.record("john-3-16").unwrap().difficulty, DifficultyLevel::MIN);
    }

    #[test]
    fn test_chapter_unlock_through_store() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        let chapter = Chapter::new(
            "Psalm 117",
            vec![
                "O praise the LORD, all ye nations: praise him, all ye people.".to_string(),
                "For his merciful kindness is great toward us".to_string(),
            ],
            "KJV",
        );
        store.dispatch(Action::AddChapter(chapter)).unwrap();

        store.dispatch(play("psalm-117", GameType::FillBlank, 90.0)).unwrap();
        let event = store.dispatch(play("psalm-117", GameType::FirstLetter, 80.0)).unwrap();

        match event {
            Event::SessionRecorded(outcome) => assert_eq!(outcome.unlocked_verse, Some(1)),
            other => panic!("expected a session, got {:?}", other),
        }
        assert_eq!(
            store.record("psalm-117").unwrap().games_today,
            GameType::chapter_multi_verse()
        );
    }

    #[test]
    fn test_archive_restore_and_remove() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();

        store.dispatch(Action::Archive { id: "john-3-16".to_string() }).unwrap();
        assert!(store.storage().read(ARCHIVED_KEY).unwrap().unwrap().contains("john-3-16"));
        assert!(matches!(
            store.dispatch(Action::AddVerse(john_3_16())),
            Err(Error::AlreadyTracked(_))
        ));

        store.dispatch(Action::Restore { id: "john-3-16".to_string() }).unwrap();
        store.dispatch(Action::Remove { id: "john-3-16".to_string() }).unwrap();
        assert!(store.tracker().active.is_empty());
        assert!(store.tracker().archived.is_empty());
    }

    #[test]
    fn test_prayers_through_store() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();

        store
            .dispatch(Action::AddPrayer {
                title: "Rain".to_string(),
                body: "for the farms".to_string(),
            })
            .unwrap();
        let event = store.dispatch(Action::Pray { id: "rain".to_string() }).unwrap();
        store.dispatch(Action::MarkAnswered { id: "rain".to_string() }).unwrap();

        assert_eq!(event, Event::Prayed { id: "rain".to_string(), times: 1 });
        assert!(store.prayers().prayers["rain"].is_answered());
        assert!(store.dispatch(Action::Pray { id: "snow".to_string() }).is_err());
    }

    #[test]
    fn test_unsubscribe_stops_events() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let id = store.subscribe(move |_| *counter.borrow_mut() += 1);

        store.dispatch(Action::RollOver).unwrap();
        assert!(store.unsubscribe(id));
        store.dispatch(Action::RollOver).unwrap();

        assert_eq!(*count.borrow(), 1);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn test_import_replaces_state() {
        let clock = start();
        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();
        let backup = store.backup();

        let mut other = Store::load(MemoryStore::new(), &clock).unwrap();
        let event = other.dispatch(Action::Import(backup)).unwrap();

        assert_eq!(event, Event::Imported { items: 1 });
        assert!(other.record("john-3-16").is_some());
        assert_eq!(other.verses().len(), 1);
    }

    #[test]
    fn test_import_rederives_inflated_counters() {
        let clock = start();
        let mut record = ProgressRecord::new_verse("john-3-16", 12, clock.today()).unwrap();
        record.completed_games_today = 9;
        record.last_reviewed = Some(clock.today());
        record.overall_progress = 87.0;
        let mut backup = Backup::default();
        backup.progress.insert(record.id.clone(), record);

        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::Import(backup)).unwrap();

        let record = store.record("john-3-16").unwrap();
        assert_eq!(record.completed_games_today, 0);
        assert_eq!(record.overall_progress, 0.0);
    }

    #[test]
    fn test_import_rejects_inconsistent_backup() {
        let clock = start();
        let record = ProgressRecord::new_verse("b", 4, clock.today()).unwrap();
        let mut misfiled = Backup::default();
        misfiled.progress.insert("a".to_string(), record.clone());

        let mut store = Store::load(MemoryStore::new(), &clock).unwrap();
        store.dispatch(Action::AddVerse(john_3_16())).unwrap();

        assert!(matches!(
            store.dispatch(Action::Import(misfiled)),
            Err(Error::InvalidBackup(_))
        ));

        let mut overlapping = Backup::default();
        overlapping.progress.insert("b".to_string(), record.clone());
        overlapping.archived.insert("b".to_string(), record);
        assert!(matches!(
            store.dispatch(Action::Import(overlapping)),
            Err(Error::InvalidBackup(_))
        ));

        assert!(store.record("john-3-16").is_some());
        assert!(store.record("b").is_none());
    }

    #[test]
    fn test_corrupt_progress_fails_load() {
        let clock = start();
        let mut storage = MemoryStore::new();
        storage.write(PROGRESS_KEY, "{not json").unwrap();

        assert!(matches!(Store::load(storage, &clock), Err(Error::Json(_))));
    }
}
