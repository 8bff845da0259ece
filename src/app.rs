//! Command-line front end.
//! Turns subcommands into store actions and prints what happened.

use chrono::NaiveDate;
use clap::Subcommand;
use log::warn;
use std::path::PathBuf;
use verse_memory::clock::Clock;
use verse_memory::database::{SqliteStore, db};
use verse_memory::export::{export_json_to_path, import_json};
use verse_memory::models::verse::DEFAULT_TRANSLATION;
use verse_memory::models::{GameResult, GameType, ProgressRecord};
use verse_memory::{Action, Chapter, Event, Result, SessionOutcome, Store, Verse};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a verse to the library and start memorizing it
    AddVerse {
        reference: String,
        text: String,
        #[arg(long, default_value = DEFAULT_TRANSLATION)]
        translation: String,
    },
    /// Add a chapter, one argument per verse; verses unlock one at a time
    AddChapter {
        reference: String,
        #[arg(required = true)]
        verses: Vec<String>,
        #[arg(long, default_value = DEFAULT_TRANSLATION)]
        translation: String,
    },
    /// Record a finished game
    Play {
        id: String,
        #[arg(long)]
        game: GameType,
        /// Percentage of words answered correctly
        #[arg(long)]
        accuracy: f64,
    },
    /// Move a verse or chapter up one difficulty level
    Advance { id: String },
    /// Start a verse or chapter over from level 1
    Reset { id: String },
    /// Show the active set, or one item in detail
    Status { id: Option<String> },
    /// Show how far each difficulty level is completed
    Levels { id: String },
    Archive { id: String },
    Restore { id: String },
    Remove { id: String },
    /// Re-check the day boundary for every item
    Rollover,
    /// Move the simulated date forward by one day
    NextDay,
    #[command(subcommand)]
    Prayer(PrayerCommand),
    /// Write a JSON backup of everything
    Export { path: PathBuf },
    /// Replace everything with a JSON backup
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum PrayerCommand {
    Add {
        title: String,
        #[arg(default_value = "")]
        body: String,
    },
    /// Count one more time prayed
    Pray { id: String },
    Answered { id: String },
    Remove { id: String },
    /// List open prayers (add --all for answered ones too)
    List {
        #[arg(long)]
        all: bool,
    },
}

pub struct App<C: Clock> {
    store: Store<SqliteStore, C>,
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn game_list(games: &[GameType]) -> String {
    games
        .iter()
        .map(|g| g.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl<C: Clock> App<C> {
    pub fn new(mut store: Store<SqliteStore, C>) -> Self {
        store.subscribe(|event| {
            if let Event::DayRolledOver { today, summary } = event {
                for id in &summary.streaks_broken {
                    println!("{}: streak for '{}' ended", today, id);
                }
            }
        });
        Self { store }
    }

    pub fn is_empty(&self) -> bool {
        let tracker = self.store.tracker();
        tracker.active.is_empty()
            && tracker.archived.is_empty()
            && self.store.verses().is_empty()
            && self.store.chapters().is_empty()
    }

    /// Gives a fresh database something to practice.
    pub fn seed_sample_library(&mut self) -> Result<()> {
        let verse = Verse::new(
            "John 3:16",
            "For God so loved the world, that he gave his only begotten Son, that whosoever \
             believeth in him should not perish, but have everlasting life.",
            DEFAULT_TRANSLATION,
        );
        self.store.dispatch(Action::AddVerse(verse))?;
        println!("Sample verse John 3:16 added!");
        Ok(())
    }

    pub fn run(&mut self, command: Command) -> Result<()> {
        if !matches!(command, Command::Rollover) {
            self.store.check_day_boundary();
        }

        match command {
            Command::AddVerse {
                reference,
                text,
                translation,
            } => {
                let verse = Verse::new(&reference, &text, &translation);
                let id = verse.id.clone();
                self.store.dispatch(Action::AddVerse(verse))?;
                println!("Added '{}' as {}", reference, id);
            }
            Command::AddChapter {
                reference,
                verses,
                translation,
            } => {
                let chapter = Chapter::new(&reference, verses, &translation);
                let (id, count) = (chapter.id.clone(), chapter.verses.len());
                self.store.dispatch(Action::AddChapter(chapter))?;
                println!("Added '{}' as {} ({} verses)", reference, id, count);
            }
            Command::Play { id, game, accuracy } => {
                if let Some(record) = self.store.record(&id)
                    && !record.games_today.contains(&game)
                {
                    warn!(
                        "{} is not among today's games for '{}' ({})",
                        game,
                        id,
                        game_list(&record.games_today)
                    );
                }
                let result = GameResult::new(game, accuracy)?;
                match self.store.dispatch(Action::RecordSession { id, result })? {
                    Event::SessionRecorded(outcome) => self.show_outcome(&outcome),
                    Event::SessionSkipped { id } => println!("'{}' is not being memorized", id),
                    _ => {}
                }
            }
            Command::Advance { id } => {
                if let Event::LevelAdvanced { id, level } =
                    self.store.dispatch(Action::AdvanceLevel { id })?
                {
                    println!("'{}' is now at level {}", self.store.reference(&id), level);
                }
            }
            Command::Reset { id } => {
                self.store.dispatch(Action::Reset { id: id.clone() })?;
                println!("'{}' starts over at level 1", self.store.reference(&id));
            }
            Command::Status { id: Some(id) } => self.show_record(&id),
            Command::Status { id: None } => self.show_active_set(),
            Command::Levels { id } => self.show_levels(&id)?,
            Command::Archive { id } => {
                self.store.dispatch(Action::Archive { id: id.clone() })?;
                println!("Archived '{}'", id);
            }
            Command::Restore { id } => {
                self.store.dispatch(Action::Restore { id: id.clone() })?;
                println!("Restored '{}'", id);
            }
            Command::Remove { id } => {
                self.store.dispatch(Action::Remove { id: id.clone() })?;
                println!("Removed '{}'", id);
            }
            Command::Rollover => {
                if let Event::DayRolledOver { today, summary } =
                    self.store.dispatch(Action::RollOver)?
                {
                    println!(
                        "{}: {} daily counters reset, {} streaks ended",
                        today,
                        summary.counters_reset,
                        summary.streaks_broken.len()
                    );
                }
            }
            Command::NextDay => {
                let next = db::advance_day(self.store.storage().connection())?;
                println!("Simulated date is now {} (use --simulated-date)", next);
            }
            Command::Prayer(command) => self.run_prayer(command)?,
            Command::Export { path } => {
                export_json_to_path(&self.store.backup(), &path)?;
                println!("Backup written to '{}'", path.display());
            }
            Command::Import { path } => {
                let backup = import_json(&path)?;
                if let Event::Imported { items } = self.store.dispatch(Action::Import(backup))? {
                    println!("Imported {} active items from '{}'", items, path.display());
                }
            }
        }
        Ok(())
    }

    fn run_prayer(&mut self, command: PrayerCommand) -> Result<()> {
        match command {
            PrayerCommand::Add { title, body } => {
                if let Event::PrayerAdded { id } =
                    self.store.dispatch(Action::AddPrayer { title, body })?
                {
                    println!("Added prayer {}", id);
                }
            }
            PrayerCommand::Pray { id } => {
                if let Event::Prayed { id, times } = self.store.dispatch(Action::Pray { id })? {
                    println!("Prayed for '{}' ({} times)", id, times);
                }
            }
            PrayerCommand::Answered { id } => {
                self.store.dispatch(Action::MarkAnswered { id: id.clone() })?;
                println!("Marked '{}' as answered", id);
            }
            PrayerCommand::Remove { id } => {
                self.store.dispatch(Action::RemovePrayer { id: id.clone() })?;
                println!("Removed prayer '{}'", id);
            }
            PrayerCommand::List { all } => {
                let prayers = self.store.prayers();
                let listed: Vec<_> = if all {
                    prayers.prayers.values().collect()
                } else {
                    prayers.open().collect()
                };
                if listed.is_empty() {
                    println!("No prayers");
                }
                for prayer in listed {
                    let answered = prayer
                        .answered
                        .map(|d| format!(", answered {}", d))
                        .unwrap_or_default();
                    println!(
                        "  - {} ({}): prayed {} times, last {}{}",
                        prayer.title,
                        prayer.id,
                        prayer.times_prayed,
                        format_date(prayer.last_prayed),
                        answered
                    );
                }
            }
        }
        Ok(())
    }

    fn show_outcome(&self, outcome: &SessionOutcome) {
        println!(
            "{}: {}/{} games today, progress {:.0}%",
            self.store.reference(&outcome.id),
            outcome.completed_games_today,
            outcome.daily_requirement,
            outcome.overall_progress
        );
        if outcome.day_completed {
            println!("Day complete! Streak: {} days", outcome.streak_days);
        }
        if let Some(index) = outcome.unlocked_verse {
            println!("Verse {} unlocked", index + 1);
        }
        if outcome.can_advance {
            println!("Level complete, run `advance {}` to move up", outcome.id);
        }
    }

    fn show_active_set(&self) {
        let tracker = self.store.tracker();
        println!("Today is {}", self.store.today());
        if tracker.active.is_empty() {
            println!("Nothing is being memorized yet");
        }
        for record in tracker.active.values() {
            self.show_summary_line(record);
        }
        if !tracker.archived.is_empty() {
            println!("{} archived", tracker.archived.len());
        }
    }

    fn show_summary_line(&self, record: &ProgressRecord) {
        let unlocked = record
            .chapter()
            .map(|c| format!(", verses {}/{}", c.unlocked, c.verse_count()))
            .unwrap_or_default();
        println!(
            "  - {} ({}): level {}, {}/{} games, streak {}, {:.0}%{}",
            self.store.reference(&record.id),
            record.id,
            record.difficulty,
            record.completed_games_today,
            record.daily_requirement(),
            record.streak_days,
            record.overall_progress,
            unlocked
        );
    }

    fn show_record(&self, id: &str) {
        let Some(record) = self.store.record(id) else {
            println!("'{}' is not being memorized", id);
            return;
        };
        self.show_summary_line(record);
        println!("    today's games: {}", game_list(&record.games_today));
        println!(
            "    reviews: {}, words {}/{} correct",
            record.review_count, record.correct_words, record.total_words
        );
        println!(
            "    last reviewed {}, streak kept {}",
            format_date(record.last_reviewed),
            format_date(record.last_streak_date)
        );
        for session in record.sessions.iter().rev().take(5) {
            println!(
                "    {} {} at level {}: {:.0}%",
                session.completed_at.format("%Y-%m-%d %H:%M"),
                session.game_type,
                session.difficulty,
                session.accuracy
            );
        }
    }

    fn show_levels(&self, id: &str) -> Result<()> {
        let report = self.store.tracker().level_report(id)?;
        for (level, completion) in report {
            println!("  level {}: {:.0}%", level, completion);
        }
        match self.store.tracker().first_incomplete_level(id)? {
            Some(level) => println!("First incomplete level: {}", level),
            None => println!("Every level complete"),
        }
        Ok(())
    }
}
