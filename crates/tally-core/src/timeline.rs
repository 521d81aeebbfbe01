//! Chronological view of records for timeline rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::TimeRecord;

/// Records laid out in start-time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub first_start: DateTime<Utc>,
    pub last_end: DateTime<Utc>,
    pub total_ms: i64,
    pub segments: Vec<TimeRecord>,
}

impl Timeline {
    /// Builds a timeline, or `None` when there are no records.
    pub fn from_records(records: &[TimeRecord]) -> Option<Self> {
        let mut segments = records.to_vec();
        segments.sort_by_key(|r| (r.start_time(), r.id()));

        let first_start = segments.first()?.start_time();
        let last_end = segments.iter().map(TimeRecord::end_time).max()?;
        let total_ms = crate::stats::total_duration_ms(&segments);

        Some(Self {
            first_start,
            last_end,
            total_ms,
            segments,
        })
    }

    /// Wall-clock span from the first start to the last end.
    pub fn span_ms(&self) -> i64 {
        crate::types::elapsed_ms(self.first_start, self.last_end)
    }

    /// Time covered by at least one record. Overlapping spans count once.
    pub fn covered_ms(&self) -> i64 {
        let mut covered = 0;
        let mut open: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        for segment in &self.segments {
            let (start, end) = (segment.start_time(), segment.end_time());
            open = match open {
                Some((open_start, open_end)) if start <= open_end => {
                    Some((open_start, open_end.max(end)))
                }
                Some((open_start, open_end)) => {
                    covered += crate::types::elapsed_ms(open_start, open_end);
                    Some((start, end))
                }
                None => Some((start, end)),
            };
        }
        if let Some((open_start, open_end)) = open {
            covered += crate::types::elapsed_ms(open_start, open_end);
        }
        covered
    }

    /// Time inside the span that no record covers.
    pub fn untracked_ms(&self) -> i64 {
        (self.span_ms() - self.covered_ms()).max(0)
    }
}
