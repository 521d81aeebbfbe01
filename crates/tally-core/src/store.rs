//! Ordered collection of finalized records.

use tracing::{debug, warn};

use crate::record::TimeRecord;
use crate::stats::{self, ActivityStats, TimeStats};
use crate::timeline::Timeline;
use crate::types::{RecordId, ValidationError};

/// Newest-first, append-only record collection.
///
/// Records only leave the store through [`RecordStore::delete`] or
/// [`RecordStore::clear`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<TimeRecord>,
    /// `None` once `i64::MAX` has been handed out.
    next_id: Option<RecordId>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: Some(RecordId::default()),
        }
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted records, restoring newest-first order.
    pub fn from_records(mut records: Vec<TimeRecord>) -> Self {
        records.sort_by_key(|r| std::cmp::Reverse(r.id()));
        let next_id = match records.first() {
            Some(newest) => newest.id().next(),
            None => Some(RecordId::default()),
        };
        if next_id.is_none() {
            warn!("restored records use the highest id; new records cannot be added");
        }
        Self { records, next_id }
    }

    /// Reserves the id for the next record.
    pub(crate) fn allocate_id(&mut self) -> Result<RecordId, ValidationError> {
        let id = self.next_id.ok_or(ValidationError::IdsExhausted)?;
        self.next_id = id.next();
        Ok(id)
    }

    /// Inserts a record at the front.
    pub fn append(&mut self, record: TimeRecord) {
        if self.next_id.is_some_and(|next| record.id() >= next) {
            self.next_id = record.id().next();
        }
        debug!(
            id = %record.id(),
            activity = %record.activity(),
            duration_ms = record.duration_ms(),
            "record appended"
        );
        self.records.insert(0, record);
    }

    /// Removes the record with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        self.records.len() != before
    }

    /// Empties the store. Ids keep counting up from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, id: RecordId) -> Option<&TimeRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Records, newest first.
    pub fn records(&self) -> &[TimeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_duration_ms(&self) -> i64 {
        stats::total_duration_ms(&self.records)
    }

    pub fn aggregate_by_activity(&self) -> Vec<ActivityStats> {
        stats::aggregate_by_activity(&self.records)
    }

    pub fn summary_stats(&self) -> TimeStats {
        stats::summary_stats(&self.records)
    }

    pub fn unique_activities(&self, exclude_misc: bool) -> Vec<String> {
        stats::unique_activities(&self.records, exclude_misc)
    }

    pub fn timeline(&self) -> Option<Timeline> {
        Timeline::from_records(&self.records)
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a TimeRecord;
    type IntoIter = std::slice::Iter<'a, TimeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
