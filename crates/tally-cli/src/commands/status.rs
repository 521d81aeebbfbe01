//! Status command for showing the timer state.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tally_core::{Phase, TimeAccountingEngine, TrackerState, format_duration};

use super::util::format_clock;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    phase: Phase,
    activity: Option<&'a str>,
    started_at: Option<DateTime<Utc>>,
    elapsed_ms: Option<i64>,
    misc_enabled: bool,
    misc_elapsed_ms: Option<i64>,
    records: usize,
    total_ms: i64,
}

/// One-line summary of the timer state.
pub fn headline(state: &TrackerState) -> String {
    let activity = state
        .current_activity()
        .map_or("", |activity| activity.as_str());
    let primary = match state.phase() {
        Phase::Idle => "Idle".to_string(),
        Phase::Running => format!("Tracking {activity}"),
        Phase::Paused => format!("Paused {activity}"),
    };
    if state.misc_running() {
        format!("{primary}; counting misc time.")
    } else {
        format!("{primary}.")
    }
}

pub fn run<W, Tz>(
    writer: &mut W,
    engine: &TimeAccountingEngine,
    now: DateTime<Utc>,
    tz: &Tz,
    json: bool,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let state = engine.state();
    let live = engine.live_elapsed(now);
    let records = engine.records();

    if json {
        let report = StatusReport {
            phase: state.phase(),
            activity: state.current_activity().map(|a| a.as_str()),
            started_at: state.active_start_time(),
            elapsed_ms: live.primary_ms,
            misc_enabled: state.misc_enabled(),
            misc_elapsed_ms: live.misc_ms,
            records: records.len(),
            total_ms: records.total_duration_ms(),
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(writer, "{}", headline(state))?;
    if let Some(activity) = state.current_activity() {
        writeln!(writer, "Activity: {activity} ({})", state.phase())?;
    }
    if let Some(started) = state.active_start_time() {
        writeln!(writer, "Started:  {}", format_clock(started, tz))?;
    }
    if let Some(elapsed) = live.primary_ms {
        writeln!(writer, "Elapsed:  {}", format_duration(elapsed))?;
    }
    match (state.misc_enabled(), live.misc_ms) {
        (true, Some(misc)) => writeln!(writer, "Misc:     on ({})", format_duration(misc))?,
        (true, None) => writeln!(writer, "Misc:     on")?,
        (false, _) => writeln!(writer, "Misc:     off")?,
    }
    writeln!(
        writer,
        "Records:  {} ({})",
        records.len(),
        format_duration(records.total_duration_ms())
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use insta::assert_snapshot;
    use tally_core::EngineConfig;

    /// 2025-01-29T09:00:00Z
    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_738_141_200, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn render(engine: &TimeAccountingEngine, now: DateTime<Utc>, json: bool) -> String {
        let mut output = Vec::new();
        run(&mut output, engine, now, &Utc, json).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn status_idle() {
        let engine = TimeAccountingEngine::new(EngineConfig::default());
        assert_snapshot!(render(&engine, at_ms(0), false), @r"
        Idle.
        Misc:     off
        Records:  0 (00:00:00)
        ");
    }

    #[test]
    fn status_running_with_records() {
        let mut engine = TimeAccountingEngine::new(EngineConfig::default());
        engine.start_timer("Study", at_ms(0)).unwrap();
        engine.switch_activity("Reading", at_ms(600_000)).unwrap();

        assert_snapshot!(render(&engine, at_ms(690_000), false), @r"
        Tracking Reading.
        Activity: Reading (running)
        Started:  09:10:00
        Elapsed:  00:01:30
        Misc:     off
        Records:  1 (00:10:00)
        ");
    }

    #[test]
    fn status_paused_counts_misc() {
        let mut engine = TimeAccountingEngine::new(EngineConfig::default());
        let _ = engine.toggle_misc(at_ms(0));
        engine.start_timer("Study", at_ms(5_000)).unwrap();
        let _ = engine.pause_timer(at_ms(65_000));

        assert_snapshot!(render(&engine, at_ms(125_000), false), @r"
        Paused Study; counting misc time.
        Activity: Study (paused)
        Elapsed:  00:00:00
        Misc:     on (00:01:00)
        Records:  2 (00:01:05)
        ");
    }

    #[test]
    fn status_json() {
        let mut engine = TimeAccountingEngine::new(EngineConfig::default());
        engine.start_timer("Study", at_ms(0)).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&render(&engine, at_ms(42_000), true)).unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["activity"], "Study");
        assert_eq!(json["elapsed_ms"], 42_000);
        assert_eq!(json["misc_enabled"], false);
        assert!(json["misc_elapsed_ms"].is_null());
    }
}
