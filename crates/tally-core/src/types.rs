//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved activity label for unclassified (misc) time.
pub const MISC_ACTIVITY: &str = "Miscellaneous";

/// Default minimum duration a segment needs before it becomes a record.
pub const DEFAULT_MIN_DURATION_MS: i64 = 1000;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A record span ends at or before it starts.
    #[error("end time {end} must be after start time {start}")]
    InvertedSpan {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A stored duration disagrees with its span.
    #[error("duration {duration_ms}ms does not match span of {span_ms}ms")]
    DurationMismatch { duration_ms: i64, span_ms: i64 },

    /// A span is shorter than the configured threshold.
    #[error("duration {duration_ms}ms is below the {threshold_ms}ms minimum")]
    BelowThreshold { duration_ms: i64, threshold_ms: i64 },

    /// The minimum duration threshold must be positive.
    #[error("minimum duration must be at least 1ms, got {value}")]
    ThresholdTooSmall { value: i64 },

    /// A duration reaches outside the representable time range.
    #[error("duration {duration_ms}ms is out of range")]
    OutOfRange { duration_ms: i64 },

    /// Every record id has been handed out.
    #[error("no record ids left")]
    IdsExhausted,
}

/// A validated, trimmed activity label.
///
/// Labels must contain at least one non-whitespace character. Surrounding
/// whitespace is stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityName(String);

impl ActivityName {
    /// Creates a new label after validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "activity" });
        }
        if trimmed.len() == name.len() {
            Ok(Self(name))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// The reserved misc label.
    pub fn misc() -> Self {
        Self(MISC_ACTIVITY.to_string())
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved misc label.
    pub fn is_misc(&self) -> bool {
        self.0 == MISC_ACTIVITY
    }
}

impl TryFrom<String> for ActivityName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ActivityName {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActivityName> for String {
    fn from(name: ActivityName) -> Self {
        name.0
    }
}

impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ActivityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a finalized record.
///
/// Ids are assigned by the record store in creation order and are never
/// reused while the store is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// The following id, or `None` at `i64::MAX`.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl Default for RecordId {
    /// The first id handed out by an empty store.
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Drops sub-millisecond precision so timestamps survive storage round-trips.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// Milliseconds from `start` to `end`, clamped at zero.
pub fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds().max(0)
}
