//! Stats command: totals per activity and focus/misc split.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tally_core::{ActivityStats, TimeAccountingEngine, TimeStats, format_duration};

#[derive(Debug, Serialize)]
struct StatsReport {
    summary: TimeStats,
    activities: Vec<ActivityStats>,
}

pub fn run<W: Write>(writer: &mut W, engine: &TimeAccountingEngine, json: bool) -> Result<()> {
    let records = engine.records();
    let summary = records.summary_stats();
    let activities = records.aggregate_by_activity();

    if json {
        let report = StatsReport {
            summary,
            activities,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    if activities.is_empty() {
        writeln!(writer, "No records.")?;
        return Ok(());
    }

    writeln!(writer, "SUMMARY")?;
    writeln!(writer, "───────")?;
    writeln!(
        writer,
        "Total: {} ({})",
        format_duration(summary.total_ms),
        plural(summary.total_count, "record")
    )?;
    writeln!(
        writer,
        "Focus: {} ({})",
        format_duration(summary.focus_ms),
        plural(summary.focus_count, "record")
    )?;
    writeln!(
        writer,
        "Misc:  {} ({})",
        format_duration(summary.misc_ms),
        plural(summary.misc_count, "record")
    )?;
    let names = records.unique_activities(true);
    if !names.is_empty() {
        writeln!(writer, "Activities: {}", names.join(", "))?;
    }

    writeln!(writer)?;
    writeln!(writer, "BY ACTIVITY")?;
    writeln!(writer, "───────────")?;
    let width = activities
        .iter()
        .map(|a| a.name.chars().count())
        .max()
        .unwrap_or(0);
    for activity in &activities {
        writeln!(
            writer,
            "{:<width$}  {}  {:>5.1}%  {}",
            activity.name,
            format_duration(activity.duration_ms),
            activity.percentage,
            plural(activity.count, "record")
        )?;
    }

    Ok(())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
