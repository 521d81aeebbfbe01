//! Shared utilities for CLI commands.

use std::fmt::Display;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tally_core::{Outcome, TimeRecord, Transition};

/// Parse a wall-clock time given as `HH:MM`.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time: {s}. Use HH:MM (e.g., 09:30)"))
}

/// Resolve a local `start`..`end` span on `date` into UTC.
///
/// An `end` at or before `start` is taken to be on the following day.
pub fn resolve_span<Tz: TimeZone>(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end_date = if end <= start {
        date.succ_opt().context("date out of range")?
    } else {
        date
    };
    Ok((
        local_to_utc(date.and_time(start), tz)?,
        local_to_utc(end_date.and_time(end), tz)?,
    ))
}

fn local_to_utc<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{naive} does not exist in the local time zone"))
}

/// `HH:MM:SS` in the given time zone.
pub fn format_clock<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%H:%M:%S").to_string()
}

/// `HH:MM:SS - HH:MM:SS` for a record in the given time zone.
pub fn format_time_range<Tz>(record: &TimeRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} - {}",
        format_clock(record.start_time(), tz),
        format_clock(record.end_time(), tz)
    )
}

/// Returns the outcome, or an error if a listener failed to save the change.
pub fn saved(transition: Transition) -> Result<Outcome> {
    if let Some(err) = transition.listener_errors.into_iter().next() {
        return Err(anyhow::Error::new(err).context("failed to save changes"));
    }
    Ok(transition.outcome)
}
