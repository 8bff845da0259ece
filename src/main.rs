mod app;

use app::{App, Command};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use verse_memory::clock::{Clock, FixedClock, SystemClock};
use verse_memory::database::{SqliteStore, db};
use verse_memory::{Result, Store};

#[derive(Parser, Debug)]
#[command(name = "versemem", version, about = "Memorize Bible verses and keep a prayer list")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "VERSEMEM_DB", default_value = "db.sqlite3")]
    db: PathBuf,

    /// Use the date stored in the database (see `next-day`) instead of today
    #[arg(long, env = "VERSEMEM_SIMULATED")]
    simulated_date: bool,

    #[command(subcommand)]
    command: Command,
}

fn run_with<C: Clock>(storage: SqliteStore, clock: C, command: Command) -> Result<()> {
    let store = Store::load(storage, clock)?;
    let mut app = App::new(store);

    if app.is_empty() {
        app.seed_sample_library()?;
    }

    app.run(command)
}

fn run(cli: Cli) -> Result<()> {
    let conn = db::init_database(&cli.db)?;
    info!("using database '{}'", cli.db.display());

    if cli.simulated_date {
        let clock = FixedClock::on(db::get_current_date(&conn)?);
        info!("simulated date {}", clock.today());
        run_with(SqliteStore::new(conn), clock, cli.command)
    } else {
        run_with(SqliteStore::new(conn), SystemClock, cli.command)
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
