use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tally_core::{PersistOnChange, TimeAccountingEngine};
use tracing_subscriber::EnvFilter;

use tally_cli::commands::timer::TimerAction;
use tally_cli::commands::{export, records, stats, status, timeline, timer};
use tally_cli::{Cli, Commands, Config};

/// Load config, open the database and restore the engine from it.
///
/// The returned engine saves back to the database after every change.
fn open_engine(config_path: Option<&Path>) -> Result<TimeAccountingEngine> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let engine_config = config
        .engine_config()
        .context("invalid min_duration_ms in configuration")?;
    let db = tally_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    let mut engine =
        TimeAccountingEngine::restore(engine_config, &db).context("failed to load saved state")?;
    engine.subscribe(PersistOnChange::new(db));
    Ok(engine)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut engine = open_engine(cli.config.as_deref())?;
    let now = Utc::now();
    let mut out = std::io::stdout().lock();

    let action = match command {
        Commands::Start { activity } => Some(TimerAction::Start(activity)),
        Commands::Pause => Some(TimerAction::Pause),
        Commands::Resume => Some(TimerAction::Resume),
        Commands::Stop => Some(TimerAction::Stop),
        Commands::Switch { activity } => Some(TimerAction::Switch(activity)),
        Commands::Misc { yes } => Some(TimerAction::Misc { confirm: yes }),
        Commands::Status { json } => {
            status::run(&mut out, &engine, now, &Local, json)?;
            None
        }
        Commands::Records => {
            records::list(&mut out, &engine, &Local)?;
            None
        }
        Commands::Add {
            activity,
            start,
            end,
        } => {
            records::add(&mut out, &mut engine, &activity, &start, &end, now, &Local)?;
            None
        }
        Commands::Delete { id } => {
            records::delete(&mut out, &mut engine, id)?;
            None
        }
        Commands::Clear { yes } => {
            records::clear(&mut out, &mut engine, yes)?;
            None
        }
        Commands::Stats { json } => {
            stats::run(&mut out, &engine, json)?;
            None
        }
        Commands::Timeline => {
            timeline::run(&mut out, &engine, &Local)?;
            None
        }
        Commands::Export { format } => {
            export::run(&mut out, &engine, format, &Local)?;
            None
        }
    };

    if let Some(action) = action {
        timer::run(&mut out, &mut engine, &action, now)?;
    }
    out.flush()?;

    Ok(())
}
