//! Time accounting engine.
//!
//! Splits wall-clock time into non-overlapping, attributed records across
//! start/pause/resume/stop/switch and misc-toggle transitions.
//!
//! # Segments
//!
//! Two kinds of segment can be open: the primary activity timer and the misc
//! timer. At most one of them is accumulating at any instant; opening one
//! closes the other. Every boundary finalizes the closed segment as its own
//! record, so a paused-then-resumed activity yields one record per
//! uninterrupted window.
//!
//! # Clock
//!
//! Every transition takes a single `now` read from the caller. The engine
//! truncates it to milliseconds once and never samples the clock itself.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::persist::{Change, EngineListener, ListenerError, Persistence, PersistenceError};
use crate::record::TimeRecord;
use crate::state::{LiveElapsed, Primary, SegmentKind, TrackerState};
use crate::store::RecordStore;
use crate::types::{
    ActivityName, DEFAULT_MIN_DURATION_MS, RecordId, ValidationError, elapsed_ms,
    truncate_to_millis,
};

/// Configuration for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Segments shorter than this are dropped instead of recorded.
    /// Default: 1000 (1 second).
    min_duration_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: DEFAULT_MIN_DURATION_MS,
        }
    }
}

impl EngineConfig {
    /// Creates a config with a custom threshold. Must be at least 1ms.
    pub const fn new(min_duration_ms: i64) -> Result<Self, ValidationError> {
        if min_duration_ms < 1 {
            return Err(ValidationError::ThresholdTooSmall {
                value: min_duration_ms,
            });
        }
        Ok(Self { min_duration_ms })
    }

    pub const fn min_duration_ms(&self) -> i64 {
        self.min_duration_ms
    }
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected input; state is unchanged.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Restoring from a persistence backend failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Why a transition had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    AlreadyRunning,
    NotRunning,
    NotPaused,
    NoActiveSession,
    MiscDisabled,
    UnknownRecord(RecordId),
}

impl fmt::Display for IgnoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "timer is already running"),
            Self::NotRunning => write!(f, "timer is not running"),
            Self::NotPaused => write!(f, "timer is not paused"),
            Self::NoActiveSession => write!(f, "no activity in progress"),
            Self::MiscDisabled => write!(f, "misc tracking is not enabled"),
            Self::UnknownRecord(id) => write!(f, "no record with id {id}"),
        }
    }
}

/// Result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed. `finalized` holds the records this transition created,
    /// in creation order.
    Applied { finalized: Vec<TimeRecord> },
    /// Precondition not met; nothing changed.
    Ignored(IgnoredReason),
    /// Turning misc tracking off needs [`TimeAccountingEngine::confirm_misc_stop`].
    ConfirmationRequired,
}

/// A completed transition and any listener failures it caused.
#[derive(Debug)]
pub struct Transition {
    pub outcome: Outcome,
    /// Failures reported by listeners. The in-memory change stands regardless.
    pub listener_errors: Vec<ListenerError>,
}

impl Transition {
    const fn ignored(reason: IgnoredReason) -> Self {
        Self {
            outcome: Outcome::Ignored(reason),
            listener_errors: Vec::new(),
        }
    }

    pub const fn is_applied(&self) -> bool {
        matches!(self.outcome, Outcome::Applied { .. })
    }

    /// Records created by this transition.
    pub fn finalized(&self) -> &[TimeRecord] {
        match &self.outcome {
            Outcome::Applied { finalized } => finalized,
            Outcome::Ignored(_) | Outcome::ConfirmationRequired => &[],
        }
    }
}

/// Owns the tracker state and record store and is their only mutator.
pub struct TimeAccountingEngine {
    config: EngineConfig,
    state: TrackerState,
    records: RecordStore,
    listeners: Vec<Box<dyn EngineListener>>,
}

impl fmt::Debug for TimeAccountingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeAccountingEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field(
                "listeners",
                &self.listeners.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TimeAccountingEngine {
    /// Creates an idle engine with no records.
    pub fn new(config: EngineConfig) -> Self {
        Self::from_parts(config, TrackerState::default(), RecordStore::new())
    }

    /// Creates an engine from previously saved state and records.
    pub fn from_parts(config: EngineConfig, state: TrackerState, records: RecordStore) -> Self {
        let state = state.normalized();
        info!(
            phase = %state.phase(),
            misc_enabled = state.misc_enabled(),
            records = records.len(),
            min_duration_ms = config.min_duration_ms(),
            "engine initialized"
        );
        Self {
            config,
            state,
            records,
            listeners: Vec::new(),
        }
    }

    /// Restores state and records from a persistence backend.
    ///
    /// A missing state snapshot starts the engine idle with misc disabled.
    pub fn restore<P: Persistence + ?Sized>(
        config: EngineConfig,
        backend: &P,
    ) -> Result<Self, EngineError> {
        let records = backend.load_records()?;
        let state = backend.load_tracker_state()?.unwrap_or_default();
        Ok(Self::from_parts(
            config,
            state,
            RecordStore::from_records(records),
        ))
    }

    /// Registers a listener notified after every applied mutation.
    pub fn subscribe(&mut self, listener: impl EngineListener + 'static) {
        debug!(listener = listener.name(), "listener subscribed");
        self.listeners.push(Box::new(listener));
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Elapsed time of the open segments as of `now`. Pure read.
    pub fn live_elapsed(&self, now: DateTime<Utc>) -> LiveElapsed {
        self.state.live_elapsed(truncate_to_millis(now))
    }

    // ========== Transitions ==========

    /// Starts timing `activity`.
    ///
    /// Closes an open misc segment first. Ignored while already running.
    pub fn start_timer(
        &mut self,
        activity: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition, EngineError> {
        let activity = ActivityName::new(activity)?;
        if matches!(self.state.primary, Primary::Running { .. }) {
            return Ok(self.ignore("start", IgnoredReason::AlreadyRunning));
        }

        let now = truncate_to_millis(now);
        let mut finalized = Vec::new();
        finalized.extend(self.finalize_open_segment(SegmentKind::Primary, now));
        finalized.extend(self.finalize_open_segment(SegmentKind::Misc, now));
        self.state.primary = Primary::Running {
            activity,
            started_at: now,
        };

        Ok(self.commit("start", finalized, false))
    }

    /// Pauses the running activity, finalizing the segment so far.
    ///
    /// Opens a misc segment when misc tracking is enabled.
    pub fn pause_timer(&mut self, now: DateTime<Utc>) -> Transition {
        let Primary::Running { activity, .. } = &self.state.primary else {
            return self.ignore("pause", IgnoredReason::NotRunning);
        };
        let activity = activity.clone();

        let now = truncate_to_millis(now);
        let finalized: Vec<_> = self
            .finalize_open_segment(SegmentKind::Primary, now)
            .into_iter()
            .collect();
        self.state.primary = Primary::Paused { activity };
        if self.state.misc_enabled {
            self.open_misc(now);
        }

        self.commit("pause", finalized, false)
    }

    /// Resumes a paused activity in a fresh accounting window.
    pub fn resume_timer(&mut self, now: DateTime<Utc>) -> Transition {
        let Primary::Paused { activity } = &self.state.primary else {
            return self.ignore("resume", IgnoredReason::NotPaused);
        };
        let activity = activity.clone();

        let now = truncate_to_millis(now);
        let finalized: Vec<_> = self
            .finalize_open_segment(SegmentKind::Misc, now)
            .into_iter()
            .collect();
        self.state.primary = Primary::Running {
            activity,
            started_at: now,
        };

        self.commit("resume", finalized, false)
    }

    /// Stops the running or paused activity and returns to idle.
    ///
    /// Opens a misc segment when misc tracking is enabled. A misc segment
    /// already open since a pause keeps its start.
    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Transition {
        if matches!(self.state.primary, Primary::Idle) {
            return self.ignore("stop", IgnoredReason::NoActiveSession);
        }

        let now = truncate_to_millis(now);
        let finalized: Vec<_> = self
            .finalize_open_segment(SegmentKind::Primary, now)
            .into_iter()
            .collect();
        if self.state.misc_enabled {
            self.open_misc(now);
        }

        self.commit("stop", finalized, false)
    }

    /// Finalizes the running activity and immediately starts `activity`.
    pub fn switch_activity(
        &mut self,
        activity: &str,
        now: DateTime<Utc>,
    ) -> Result<Transition, EngineError> {
        let activity = ActivityName::new(activity)?;
        if !matches!(self.state.primary, Primary::Running { .. }) {
            return Ok(self.ignore("switch", IgnoredReason::NotRunning));
        }

        let now = truncate_to_millis(now);
        let mut finalized = Vec::new();
        finalized.extend(self.finalize_open_segment(SegmentKind::Primary, now));
        finalized.extend(self.finalize_open_segment(SegmentKind::Misc, now));
        self.state.primary = Primary::Running {
            activity,
            started_at: now,
        };

        Ok(self.commit("switch", finalized, false))
    }

    /// Turns misc tracking on, or asks for confirmation to turn it off.
    ///
    /// Enabling finalizes any running or paused activity, returns to idle
    /// and opens a misc segment.
    pub fn toggle_misc(&mut self, now: DateTime<Utc>) -> Transition {
        if self.state.misc_enabled {
            debug!("misc stop needs confirmation");
            return Transition {
                outcome: Outcome::ConfirmationRequired,
                listener_errors: Vec::new(),
            };
        }

        let now = truncate_to_millis(now);
        self.state.misc_enabled = true;
        let finalized: Vec<_> = self
            .finalize_open_segment(SegmentKind::Primary, now)
            .into_iter()
            .collect();
        self.open_misc(now);

        self.commit("misc_on", finalized, false)
    }

    /// Turns misc tracking off after confirmation.
    ///
    /// Finalizes any open activity and misc segment and returns to idle.
    pub fn confirm_misc_stop(&mut self, now: DateTime<Utc>) -> Transition {
        if !self.state.misc_enabled {
            return self.ignore("misc_off", IgnoredReason::MiscDisabled);
        }

        let now = truncate_to_millis(now);
        let mut finalized = Vec::new();
        finalized.extend(self.finalize_open_segment(SegmentKind::Primary, now));
        finalized.extend(self.finalize_open_segment(SegmentKind::Misc, now));
        self.state.misc_enabled = false;

        self.commit("misc_off", finalized, false)
    }

    // ========== Record management ==========

    /// Deletes a record. Ignored when no record has `id`.
    pub fn delete_record(&mut self, id: RecordId) -> Transition {
        if !self.records.delete(id) {
            return self.ignore("delete", IgnoredReason::UnknownRecord(id));
        }
        self.commit("delete", Vec::new(), true)
    }

    /// Removes every record.
    pub fn clear_records(&mut self) -> Transition {
        self.records.clear();
        self.commit("clear", Vec::new(), true)
    }

    /// Adds a record for time tracked outside the timer.
    ///
    /// The span must be non-empty and at least the minimum duration.
    pub fn add_manual_record(
        &mut self,
        activity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Transition, EngineError> {
        let activity = ActivityName::new(activity)?;
        let (start, end) = (truncate_to_millis(start), truncate_to_millis(end));
        if end <= start {
            return Err(ValidationError::InvertedSpan { start, end }.into());
        }
        let duration_ms = elapsed_ms(start, end);
        if duration_ms < self.config.min_duration_ms {
            return Err(ValidationError::BelowThreshold {
                duration_ms,
                threshold_ms: self.config.min_duration_ms,
            }
            .into());
        }

        let record = TimeRecord::new(self.records.allocate_id()?, activity, start, end)?;
        Ok(self.commit("add", vec![record], true))
    }

    // ========== Internals ==========

    /// Closes the open segment of `kind` as of `now`.
    ///
    /// Returns the record for it when it reached the minimum duration. The
    /// record is not yet in the store; [`Self::commit`] appends it.
    fn finalize_open_segment(
        &mut self,
        kind: SegmentKind,
        now: DateTime<Utc>,
    ) -> Option<TimeRecord> {
        let elapsed = self.state.elapsed_ms(kind, now)?;
        let activity = match kind {
            SegmentKind::Primary => {
                match std::mem::replace(&mut self.state.primary, Primary::Idle) {
                    Primary::Running { activity, .. } | Primary::Paused { activity, .. } => {
                        activity
                    }
                    Primary::Idle => return None,
                }
            }
            SegmentKind::Misc => {
                self.state.misc_started_at = None;
                ActivityName::misc()
            }
        };

        if elapsed < self.config.min_duration_ms {
            debug!(
                activity = %activity,
                elapsed_ms = elapsed,
                threshold_ms = self.config.min_duration_ms,
                "segment below threshold dropped"
            );
            return None;
        }

        let record = self
            .records
            .allocate_id()
            .and_then(|id| TimeRecord::ending_at(id, activity, elapsed, now));
        match record {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "could not build record for closed segment");
                None
            }
        }
    }

    /// Opens a misc segment at `now` unless one is already open.
    fn open_misc(&mut self, now: DateTime<Utc>) {
        if self.state.misc_started_at.is_none() {
            self.state.misc_started_at = Some(now);
        }
    }

    fn ignore(&self, operation: &'static str, reason: IgnoredReason) -> Transition {
        debug!(operation, phase = %self.state.phase(), %reason, "transition ignored");
        Transition::ignored(reason)
    }

    /// Appends finalized records and notifies listeners.
    fn commit(
        &mut self,
        operation: &'static str,
        finalized: Vec<TimeRecord>,
        records_changed: bool,
    ) -> Transition {
        for record in &finalized {
            self.records.append(record.clone());
        }

        info!(
            operation,
            phase = %self.state.phase(),
            misc_running = self.state.misc_running(),
            finalized = finalized.len(),
            "transition applied"
        );

        let listener_errors = self.notify(records_changed || !finalized.is_empty());
        Transition {
            outcome: Outcome::Applied { finalized },
            listener_errors,
        }
    }

    fn notify(&mut self, records_changed: bool) -> Vec<ListenerError> {
        let change = Change {
            state: &self.state,
            records: &self.records,
            records_changed,
        };

        let mut errors = Vec::new();
        for listener in &mut self.listeners {
            if let Err(source) = listener.on_change(&change) {
                warn!(
                    listener = listener.name(),
                    error = %source,
                    "listener failed; in-memory state kept"
                );
                errors.push(ListenerError {
                    listener: listener.name().to_string(),
                    source,
                });
            }
        }
        errors
    }
}
