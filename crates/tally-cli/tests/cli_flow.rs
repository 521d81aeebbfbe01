//! End-to-end tests driving the `tally` binary against a temp database.
//!
//! Each test writes a config file pointing at its own database so runs
//! never touch the user's data directory.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn tally_binary() -> String {
    env!("CARGO_BIN_EXE_tally").to_string()
}

/// Temp workspace with a config file and database path.
struct Workspace {
    _temp: TempDir,
    home: PathBuf,
    config_file: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let db_file = temp.path().join("tally.db");
        let config_file = temp.path().join("config.toml");
        std::fs::write(
            &config_file,
            format!(r#"database_path = "{}""#, db_file.display()),
        )
        .unwrap();
        Self {
            home: temp.path().to_path_buf(),
            _temp: temp,
            config_file,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(tally_binary())
            .env("HOME", &self.home)
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config_file)
            .args(args)
            .output()
            .expect("failed to run tally")
    }

    /// Runs and asserts success, returning stdout.
    fn ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "tally {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn status(&self) -> serde_json::Value {
        serde_json::from_str(&self.ok(&["status", "--json"])).unwrap()
    }

    fn db_exists(&self) -> bool {
        self.home.join("tally.db").exists()
    }
}

#[test]
fn test_timer_state_survives_between_invocations() {
    let ws = Workspace::new();

    ws.ok(&["start", "Study"]);
    assert!(ws.db_exists());
    let status = ws.status();
    assert_eq!(status["phase"], "running");
    assert_eq!(status["activity"], "Study");

    ws.ok(&["pause"]);
    assert_eq!(ws.status()["phase"], "paused");

    ws.ok(&["resume"]);
    ws.ok(&["switch", "Reading"]);
    let status = ws.status();
    assert_eq!(status["phase"], "running");
    assert_eq!(status["activity"], "Reading");

    ws.ok(&["stop"]);
    assert_eq!(ws.status()["phase"], "idle");
}

#[test]
fn test_ignored_transition_exits_successfully() {
    let ws = Workspace::new();

    let stdout = ws.ok(&["pause"]);
    assert!(
        stdout.contains("Nothing to do"),
        "expected a notice, got: {stdout}"
    );
    assert_eq!(ws.status()["phase"], "idle");
}

#[test]
fn test_empty_activity_is_rejected() {
    let ws = Workspace::new();

    let output = ws.run(&["start", "   "]);
    assert!(!output.status.success());
    assert_eq!(ws.status()["phase"], "idle");
}

#[test]
fn test_misc_stop_requires_confirmation() {
    let ws = Workspace::new();

    ws.ok(&["misc"]);
    assert_eq!(ws.status()["misc_enabled"], true);

    let stdout = ws.ok(&["misc"]);
    assert!(stdout.contains("--yes"), "expected confirmation hint: {stdout}");
    assert_eq!(ws.status()["misc_enabled"], true);

    ws.ok(&["misc", "--yes"]);
    let status = ws.status();
    assert_eq!(status["misc_enabled"], false);
    assert!(status["misc_elapsed_ms"].is_null());
}

#[test]
fn test_manual_records_flow_into_views() {
    let ws = Workspace::new();

    ws.ok(&["add", "Reading", "--start", "09:00", "--end", "10:30"]);
    ws.ok(&["add", "Study", "--start", "11:00", "--end", "11:45"]);

    let records = ws.ok(&["records"]);
    assert!(records.contains("Reading"));
    assert!(records.contains("01:30:00"));

    let stats: serde_json::Value = serde_json::from_str(&ws.ok(&["stats", "--json"])).unwrap();
    assert_eq!(stats["summary"]["total_ms"], 8_100_000);
    assert_eq!(stats["summary"]["focus_count"], 2);
    assert_eq!(stats["activities"][0]["name"], "Reading");

    let markdown = ws.ok(&["export"]);
    let lines: Vec<_> = markdown.lines().collect();
    assert_eq!(lines[0], "| # | Activity | Time range | Duration |");
    assert_eq!(lines[2], "| 1 | Study | 11:00:00 - 11:45:00 | 00:45:00 |");
    assert_eq!(lines[3], "| 2 | Reading | 09:00:00 - 10:30:00 | 01:30:00 |");

    let json: serde_json::Value =
        serde_json::from_str(&ws.ok(&["export", "--format", "json"])).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);

    let timeline = ws.ok(&["timeline"]);
    let reading = timeline.find("Reading").unwrap();
    let study = timeline.find("Study").unwrap();
    assert!(reading < study, "timeline should be chronological");
}

#[test]
fn test_add_rejects_invalid_times() {
    let ws = Workspace::new();

    assert!(!ws.run(&["add", "Reading", "--start", "9am", "--end", "10:00"]).status.success());
    assert!(ws.ok(&["records"]).contains("No records."));
}

#[test]
fn test_delete_and_clear() {
    let ws = Workspace::new();
    ws.ok(&["add", "A", "--start", "08:00", "--end", "08:30"]);
    ws.ok(&["add", "B", "--start", "09:00", "--end", "09:30"]);

    ws.ok(&["delete", "1"]);
    let records = ws.ok(&["records"]);
    assert!(!records.lines().any(|line| line.ends_with(" A")));
    assert!(records.lines().any(|line| line.ends_with(" B")));

    let stdout = ws.ok(&["delete", "1"]);
    assert!(stdout.contains("Nothing to do"));

    assert!(!ws.run(&["clear"]).status.success());
    ws.ok(&["clear", "--yes"]);
    assert!(ws.ok(&["records"]).contains("No records."));

    let added = ws.ok(&["add", "C", "--start", "10:00", "--end", "10:30"]);
    assert!(added.starts_with("Added #"), "unexpected output: {added}");
}

#[test]
fn test_invalid_threshold_in_config_fails() {
    let ws = Workspace::new();
    let mut config = std::fs::read_to_string(&ws.config_file).unwrap();
    config.push_str("\nmin_duration_ms = 0\n");
    std::fs::write(&ws.config_file, config).unwrap();

    let output = ws.run(&["status"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("min_duration_ms"), "stderr: {stderr}");
}
