//! Timer transitions: start, pause, resume, stop, switch and misc.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tally_core::{Outcome, TimeAccountingEngine, format_duration};
use tracing::debug;

use super::status::headline;
use super::util::saved;

/// A transition requested from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    Start(String),
    Pause,
    Resume,
    Stop,
    Switch(String),
    /// Toggle misc tracking. `confirm` turns it off without asking.
    Misc { confirm: bool },
}

pub fn run<W: Write>(
    writer: &mut W,
    engine: &mut TimeAccountingEngine,
    action: &TimerAction,
    now: DateTime<Utc>,
) -> Result<()> {
    debug!(?action, "applying timer action");
    let transition = match action {
        TimerAction::Start(activity) => engine.start_timer(activity, now)?,
        TimerAction::Pause => engine.pause_timer(now),
        TimerAction::Resume => engine.resume_timer(now),
        TimerAction::Stop => engine.stop_timer(now),
        TimerAction::Switch(activity) => engine.switch_activity(activity, now)?,
        TimerAction::Misc { confirm } => {
            if *confirm && engine.state().misc_enabled() {
                engine.confirm_misc_stop(now)
            } else {
                engine.toggle_misc(now)
            }
        }
    };

    match saved(transition)? {
        Outcome::Applied { finalized } => {
            for record in &finalized {
                writeln!(
                    writer,
                    "Recorded {} ({})",
                    record.activity(),
                    format_duration(record.duration_ms())
                )?;
            }
            writeln!(writer, "{}", headline(engine.state()))?;
        }
        Outcome::Ignored(reason) => {
            writeln!(writer, "Nothing to do: {reason}.")?;
        }
        Outcome::ConfirmationRequired => {
            writeln!(
                writer,
                "Misc tracking is on. Run `tally misc --yes` to turn it off."
            )?;
        }
    }

    Ok(())
}
