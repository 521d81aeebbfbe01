//! Timeline command: records in chronological order.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use tally_core::{TimeAccountingEngine, format_duration};

use super::util::{format_clock, format_time_range};

pub fn run<W, Tz>(writer: &mut W, engine: &TimeAccountingEngine, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(timeline) = engine.records().timeline() else {
        writeln!(writer, "No records.")?;
        return Ok(());
    };

    writeln!(
        writer,
        "{} - {}  tracked {}, untracked {}",
        format_clock(timeline.first_start, tz),
        format_clock(timeline.last_end, tz),
        format_duration(timeline.total_ms),
        format_duration(timeline.untracked_ms())
    )?;
    writeln!(writer)?;
    for record in &timeline.segments {
        let marker = if record.is_misc() { '·' } else { '█' };
        writeln!(
            writer,
            "{}  {}  {marker} {}",
            format_time_range(record, tz),
            format_duration(record.duration_ms()),
            record.activity()
        )?;
    }

    Ok(())
}
