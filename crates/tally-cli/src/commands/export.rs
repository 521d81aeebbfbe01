//! Export command: records as a markdown table or JSON.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use tally_core::{TimeAccountingEngine, TimeRecord, format_duration};

use super::util::format_time_range;
use crate::ExportFormat;

pub fn run<W, Tz>(
    writer: &mut W,
    engine: &TimeAccountingEngine,
    format: ExportFormat,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let records = engine.records().records();
    match format {
        ExportFormat::Markdown => writeln!(writer, "{}", markdown_table(records, tz))?,
        ExportFormat::Json => writeln!(writer, "{}", serde_json::to_string_pretty(records)?)?,
    }
    Ok(())
}

/// Renders records as a markdown table, numbered in the given order.
pub fn markdown_table<Tz>(records: &[TimeRecord], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![
        "| # | Activity | Time range | Duration |".to_string(),
        "|---|----------|------------|----------|".to_string(),
    ];
    lines.extend(records.iter().enumerate().map(|(index, record)| {
        format!(
            "| {} | {} | {} | {} |",
            index + 1,
            record.activity(),
            format_time_range(record, tz),
            format_duration(record.duration_ms())
        )
    }));
    lines.join("\n")
}
