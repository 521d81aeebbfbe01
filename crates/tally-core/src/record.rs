//! Finalized time records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityName, RecordId, ValidationError, elapsed_ms};

/// One uninterrupted capture window attributed to an activity.
///
/// Records are immutable once built. `duration_ms` always equals
/// `end_time - start_time` and the span is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRecord")]
pub struct TimeRecord {
    id: RecordId,
    activity: ActivityName,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_ms: i64,
}

/// Unchecked wire form, validated into [`TimeRecord`].
#[derive(Deserialize)]
struct RawTimeRecord {
    id: RecordId,
    activity: ActivityName,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_ms: i64,
}

impl TryFrom<RawTimeRecord> for TimeRecord {
    type Error = ValidationError;

    fn try_from(raw: RawTimeRecord) -> Result<Self, Self::Error> {
        Self::restore(
            raw.id,
            raw.activity,
            raw.start_time,
            raw.end_time,
            raw.duration_ms,
        )
    }
}

impl TimeRecord {
    /// Builds a record spanning `[start, end)`.
    pub fn new(
        id: RecordId,
        activity: ActivityName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvertedSpan { start, end });
        }
        Ok(Self {
            id,
            activity,
            start_time: start,
            end_time: end,
            duration_ms: elapsed_ms(start, end),
        })
    }

    /// Builds a record of `duration_ms` that closes at `end`.
    pub fn ending_at(
        id: RecordId,
        activity: ActivityName,
        duration_ms: i64,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let start = Duration::try_milliseconds(duration_ms)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(ValidationError::OutOfRange { duration_ms })?;
        Self::new(id, activity, start, end)
    }

    /// Rebuilds a stored record, checking that its duration matches its span.
    pub fn restore(
        id: RecordId,
        activity: ActivityName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<Self, ValidationError> {
        let record = Self::new(id, activity, start, end)?;
        if record.duration_ms != duration_ms {
            return Err(ValidationError::DurationMismatch {
                duration_ms,
                span_ms: record.duration_ms,
            });
        }
        Ok(record)
    }

    pub const fn id(&self) -> RecordId {
        self.id
    }

    pub const fn activity(&self) -> &ActivityName {
        &self.activity
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub const fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Whether this record is attributed to misc time.
    pub fn is_misc(&self) -> bool {
        self.activity.is_misc()
    }

    /// Whether the half-open spans of two records intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}
