//! Persistence collaborator contract and the post-transition listener hook.

use thiserror::Error;

use crate::record::TimeRecord;
use crate::state::TrackerState;
use crate::store::RecordStore;

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A storage backend failed.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct PersistenceError {
    pub operation: &'static str,
    #[source]
    pub source: BoxError,
}

impl PersistenceError {
    pub fn new(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Loads and saves records and tracker state across sessions.
///
/// The storage medium is up to the implementor. Timestamps must round-trip
/// with millisecond precision.
pub trait Persistence {
    /// Returns stored records, newest first.
    fn load_records(&self) -> Result<Vec<TimeRecord>, PersistenceError>;

    /// Replaces the stored records.
    fn save_records(&mut self, records: &[TimeRecord]) -> Result<(), PersistenceError>;

    fn load_tracker_state(&self) -> Result<Option<TrackerState>, PersistenceError>;

    fn save_tracker_state(&mut self, state: &TrackerState) -> Result<(), PersistenceError>;
}

/// What changed in a transition, handed to listeners after it was applied.
#[derive(Debug, Clone, Copy)]
pub struct Change<'a> {
    pub state: &'a TrackerState,
    pub records: &'a RecordStore,
    /// Whether the record collection changed.
    pub records_changed: bool,
}

/// A listener reported a failure.
#[derive(Debug, Error)]
#[error("listener `{listener}` failed: {source}")]
pub struct ListenerError {
    pub listener: String,
    #[source]
    pub source: BoxError,
}

/// Subscriber notified once after every applied mutation.
pub trait EngineListener {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    fn on_change(&mut self, change: &Change<'_>) -> Result<(), BoxError>;
}

/// Adapts a [`Persistence`] backend into a listener that saves on every change.
#[derive(Debug)]
pub struct PersistOnChange<P> {
    backend: P,
}

impl<P: Persistence> PersistOnChange<P> {
    pub const fn new(backend: P) -> Self {
        Self { backend }
    }
}

impl<P: Persistence> EngineListener for PersistOnChange<P> {
    fn name(&self) -> &str {
        "persistence"
    }

    fn on_change(&mut self, change: &Change<'_>) -> Result<(), BoxError> {
        if change.records_changed {
            self.backend.save_records(change.records.records())?;
        }
        self.backend.save_tracker_state(change.state)?;
        Ok(())
    }
}

/// In-process backend that keeps snapshots in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    pub records: Vec<TimeRecord>,
    pub state: Option<TrackerState>,
    pub saves: usize,
}

impl Persistence for MemoryPersistence {
    fn load_records(&self) -> Result<Vec<TimeRecord>, PersistenceError> {
        Ok(self.records.clone())
    }

    fn save_records(&mut self, records: &[TimeRecord]) -> Result<(), PersistenceError> {
        self.records = records.to_vec();
        self.saves += 1;
        Ok(())
    }

    fn load_tracker_state(&self) -> Result<Option<TrackerState>, PersistenceError> {
        Ok(self.state.clone())
    }

    fn save_tracker_state(&mut self, state: &TrackerState) -> Result<(), PersistenceError> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}
