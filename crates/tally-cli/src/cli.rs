//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tally_core::RecordId;

/// Activity timer.
///
/// Splits the day into non-overlapping records attributed to named
/// activities, with optional tracking of unclassified (misc) time.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start timing an activity.
    Start {
        /// Activity name.
        activity: String,
    },

    /// Pause the running activity.
    Pause,

    /// Resume the paused activity.
    Resume,

    /// Stop the current activity.
    Stop,

    /// Finish the running activity and start another.
    Switch {
        /// Activity to switch to.
        activity: String,
    },

    /// Toggle misc time tracking.
    Misc {
        /// Confirm turning misc tracking off.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the timer state.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List records, newest first.
    Records,

    /// Add a record for time tracked elsewhere.
    Add {
        /// Activity name.
        activity: String,

        /// Start time today (HH:MM, local).
        #[arg(long)]
        start: String,

        /// End time (HH:MM, local). Earlier than start means the next day.
        #[arg(long)]
        end: String,
    },

    /// Delete a record.
    Delete {
        /// Record id, as shown by `tally records`.
        id: RecordId,
    },

    /// Delete every record.
    Clear {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Show time totals per activity.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show records in chronological order.
    Timeline,

    /// Export records.
    Export {
        /// Output format.
        #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
    },
}

/// Export output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Markdown,
    Json,
}
