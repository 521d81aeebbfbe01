//! Record management: list, add, delete and clear.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use tally_core::{Outcome, RecordId, TimeAccountingEngine, format_duration};

use super::util::{format_time_range, parse_clock_time, resolve_span, saved};

/// Lists records, newest first.
pub fn list<W, Tz>(writer: &mut W, engine: &TimeAccountingEngine, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let records = engine.records();
    if records.is_empty() {
        writeln!(writer, "No records.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:>4}  {:<19}  {:<8}  Activity",
        "ID", "Time range", "Duration"
    )?;
    for record in records {
        writeln!(
            writer,
            "{:>4}  {}  {}  {}",
            record.id().get(),
            format_time_range(record, tz),
            format_duration(record.duration_ms()),
            record.activity()
        )?;
    }
    Ok(())
}

/// Adds a manual record from local `HH:MM` times on the day of `now`.
pub fn add<W, Tz>(
    writer: &mut W,
    engine: &mut TimeAccountingEngine,
    activity: &str,
    start: &str,
    end: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = now.with_timezone(tz).date_naive();
    let (start, end) = resolve_span(date, parse_clock_time(start)?, parse_clock_time(end)?, tz)?;
    let transition = engine.add_manual_record(activity, start, end)?;

    if let Outcome::Applied { finalized } = saved(transition)? {
        for record in &finalized {
            writeln!(
                writer,
                "Added #{} {}: {} ({})",
                record.id(),
                record.activity(),
                format_time_range(record, tz),
                format_duration(record.duration_ms())
            )?;
        }
    }
    Ok(())
}

pub fn delete<W: Write>(
    writer: &mut W,
    engine: &mut TimeAccountingEngine,
    id: RecordId,
) -> Result<()> {
    let described = engine.records().get(id).map(|record| {
        format!(
            "{}, {}",
            record.activity(),
            format_duration(record.duration_ms())
        )
    });
    match (saved(engine.delete_record(id))?, described) {
        (Outcome::Ignored(reason), _) => writeln!(writer, "Nothing to do: {reason}.")?,
        (_, Some(described)) => writeln!(writer, "Deleted record {id} ({described}).")?,
        (_, None) => writeln!(writer, "Deleted record {id}.")?,
    }
    Ok(())
}

/// Deletes every record. Refuses without `confirmed`.
pub fn clear<W: Write>(
    writer: &mut W,
    engine: &mut TimeAccountingEngine,
    confirmed: bool,
) -> Result<()> {
    let count = engine.records().len();
    if !confirmed {
        bail!("Refusing to delete {count} records without --yes");
    }
    saved(engine.clear_records())?;
    writeln!(writer, "Deleted {count} records.")?;
    Ok(())
}
