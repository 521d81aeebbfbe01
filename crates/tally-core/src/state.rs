//! Tracker state: the primary activity timer plus the misc timer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{ActivityName, elapsed_ms};

/// Coarse phase of the primary activity timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary activity timer.
///
/// Every pause finalizes the running window, so a paused session carries no
/// unrecorded time. Snapshots written with a `carried_ms` field still load;
/// the field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Primary {
    Idle,
    Running {
        activity: ActivityName,
        started_at: DateTime<Utc>,
    },
    Paused {
        activity: ActivityName,
    },
}

/// Which kind of segment a finalization applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Primary,
    Misc,
}

/// The single mutable tracking state owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    pub(crate) primary: Primary,
    pub(crate) misc_enabled: bool,
    pub(crate) misc_started_at: Option<DateTime<Utc>>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            primary: Primary::Idle,
            misc_enabled: false,
            misc_started_at: None,
        }
    }
}

impl TrackerState {
    pub const fn phase(&self) -> Phase {
        match self.primary {
            Primary::Idle => Phase::Idle,
            Primary::Running { .. } => Phase::Running,
            Primary::Paused { .. } => Phase::Paused,
        }
    }

    /// Label of the running or paused session, `None` when idle.
    pub const fn current_activity(&self) -> Option<&ActivityName> {
        match &self.primary {
            Primary::Idle => None,
            Primary::Running { activity, .. } | Primary::Paused { activity, .. } => Some(activity),
        }
    }

    /// Start of the current running segment. Only set while running.
    pub const fn active_start_time(&self) -> Option<DateTime<Utc>> {
        match self.primary {
            Primary::Running { started_at, .. } => Some(started_at),
            _ => None,
        }
    }

    pub const fn misc_enabled(&self) -> bool {
        self.misc_enabled
    }

    pub const fn misc_running(&self) -> bool {
        self.misc_started_at.is_some()
    }

    pub const fn misc_start_time(&self) -> Option<DateTime<Utc>> {
        self.misc_started_at
    }

    /// Elapsed time of the open segment of `kind` as of `now`, without mutating.
    ///
    /// A paused session reports zero.
    pub fn elapsed_ms(&self, kind: SegmentKind, now: DateTime<Utc>) -> Option<i64> {
        match kind {
            SegmentKind::Primary => match self.primary {
                Primary::Idle => None,
                Primary::Running { started_at, .. } => Some(elapsed_ms(started_at, now)),
                Primary::Paused { .. } => Some(0),
            },
            SegmentKind::Misc => self.misc_started_at.map(|start| elapsed_ms(start, now)),
        }
    }

    /// Live readout for a periodic display tick.
    pub fn live_elapsed(&self, now: DateTime<Utc>) -> LiveElapsed {
        LiveElapsed {
            primary_ms: self.elapsed_ms(SegmentKind::Primary, now),
            misc_ms: self.elapsed_ms(SegmentKind::Misc, now),
        }
    }

    /// Repairs a restored snapshot so that at most one segment is open.
    ///
    /// A running primary timer wins over a misc segment, and a misc segment
    /// cannot be open while misc tracking is disabled.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if matches!(self.primary, Primary::Running { .. }) && self.misc_started_at.is_some() {
            warn!("restored state had both primary and misc segments open; dropping misc segment");
            self.misc_started_at = None;
        }
        if !self.misc_enabled && self.misc_started_at.is_some() {
            warn!("restored state had a misc segment with misc tracking disabled; dropping it");
            self.misc_started_at = None;
        }
        self
    }
}

/// Elapsed readout for open segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LiveElapsed {
    pub primary_ms: Option<i64>,
    pub misc_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_738_141_200 + secs, 0).unwrap()
    }

    fn running(started: i64) -> TrackerState {
        TrackerState {
            primary: Primary::Running {
                activity: ActivityName::new("Study").unwrap(),
                started_at: at(started),
            },
            misc_enabled: false,
            misc_started_at: None,
        }
    }

    #[test]
    fn default_state_is_idle_without_misc() {
        let state = TrackerState::default();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.current_activity().is_none());
        assert!(!state.misc_enabled());
        assert!(!state.misc_running());
    }

    #[test]
    fn live_elapsed_counts_from_start() {
        let state = running(5);
        let live = state.live_elapsed(at(15));
        assert_eq!(live.primary_ms, Some(10_000));
        assert_eq!(live.misc_ms, None);
    }

    #[test]
    fn paused_session_reports_zero_elapsed() {
        let state = TrackerState {
            primary: Primary::Paused {
                activity: ActivityName::new("Study").unwrap(),
            },
            misc_enabled: false,
            misc_started_at: None,
        };
        assert_eq!(state.elapsed_ms(SegmentKind::Primary, at(60)), Some(0));
    }

    #[test]
    fn legacy_carried_time_is_ignored_on_load() {
        let json = r#"{"primary":{"phase":"running","activity":"Study","started_at":"2025-01-29T09:00:00Z","carried_ms":9223372036854775807},"misc_enabled":false,"misc_started_at":null}"#;
        let state: TrackerState = serde_json::from_str(json).unwrap();
        assert_eq!(state, running(0));
        assert_eq!(state.elapsed_ms(SegmentKind::Primary, at(30)), Some(30_000));
    }

    #[test]
    fn live_elapsed_does_not_mutate() {
        let state = running(0);
        let before = state.clone();
        let _ = state.live_elapsed(at(30));
        assert_eq!(state, before);
    }

    #[test]
    fn normalized_drops_misc_when_primary_running() {
        let mut state = running(0);
        state.misc_enabled = true;
        state.misc_started_at = Some(at(0));

        let state = state.normalized();
        assert!(!state.misc_running());
        assert_eq!(state.phase(), Phase::Running);
    }

    #[test]
    fn normalized_drops_misc_when_disabled() {
        let state = TrackerState {
            primary: Primary::Idle,
            misc_enabled: false,
            misc_started_at: Some(at(0)),
        }
        .normalized();
        assert!(!state.misc_running());
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let state = running(0);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""phase":"running""#));
        let parsed: TrackerState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
