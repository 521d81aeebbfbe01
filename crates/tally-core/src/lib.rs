//! Core domain logic for the tally activity timer.
//!
//! This crate contains the fundamental types and logic for:
//! - Timer state: idle/running/paused activity timer plus the misc timer
//! - Time accounting: turning transitions into non-overlapping records
//! - Records: the newest-first record store and its aggregations
//! - Persistence: the storage contract and post-transition listeners

pub mod engine;
pub mod format;
pub mod persist;
pub mod record;
pub mod state;
pub mod stats;
pub mod store;
pub mod timeline;
pub mod types;

pub use engine::{
    EngineConfig, EngineError, IgnoredReason, Outcome, TimeAccountingEngine, Transition,
};
pub use format::format_duration;
pub use persist::{
    BoxError, Change, EngineListener, ListenerError, MemoryPersistence, PersistOnChange,
    Persistence, PersistenceError,
};
pub use record::TimeRecord;
pub use state::{LiveElapsed, Phase, Primary, SegmentKind, TrackerState};
pub use stats::{ActivityStats, TimeStats};
pub use store::RecordStore;
pub use timeline::Timeline;
pub use types::{
    ActivityName, DEFAULT_MIN_DURATION_MS, MISC_ACTIVITY, RecordId, ValidationError,
};
