//! Summary statistics over finalized records.

use std::collections::HashMap;

use serde::Serialize;

use crate::record::TimeRecord;

/// Totals for one activity label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStats {
    pub name: String,
    pub duration_ms: i64,
    pub count: usize,
    /// Share of the grand total, in percent. Zero when nothing is recorded.
    pub percentage: f64,
}

/// Grand totals split between misc and focus time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeStats {
    pub total_ms: i64,
    pub total_count: usize,
    pub misc_ms: i64,
    pub misc_count: usize,
    pub focus_ms: i64,
    pub focus_count: usize,
}

/// Sum of all record durations.
pub fn total_duration_ms<'a>(records: impl IntoIterator<Item = &'a TimeRecord>) -> i64 {
    records.into_iter().map(TimeRecord::duration_ms).sum()
}

/// Groups records by activity, sorted by total duration descending.
///
/// Ties are broken by activity name so the order is stable.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_by_activity(records: &[TimeRecord]) -> Vec<ActivityStats> {
    let grand_total = total_duration_ms(records);

    let mut totals: HashMap<&str, (i64, usize)> = HashMap::new();
    for record in records {
        let (duration, count) = totals.entry(record.activity().as_str()).or_insert((0, 0));
        *duration += record.duration_ms();
        *count += 1;
    }

    let mut stats: Vec<ActivityStats> = totals
        .into_iter()
        .map(|(name, (duration_ms, count))| ActivityStats {
            name: name.to_string(),
            duration_ms,
            count,
            percentage: if grand_total > 0 {
                duration_ms as f64 / grand_total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    stats.sort_by(|a, b| {
        b.duration_ms
            .cmp(&a.duration_ms)
            .then_with(|| a.name.cmp(&b.name))
    });
    stats
}

/// Computes grand, misc and focus totals.
pub fn summary_stats(records: &[TimeRecord]) -> TimeStats {
    records.iter().fold(TimeStats::default(), |mut stats, record| {
        stats.total_ms += record.duration_ms();
        stats.total_count += 1;
        if record.is_misc() {
            stats.misc_ms += record.duration_ms();
            stats.misc_count += 1;
        } else {
            stats.focus_ms += record.duration_ms();
            stats.focus_count += 1;
        }
        stats
    })
}

/// Distinct activity labels in first-seen order.
pub fn unique_activities(records: &[TimeRecord], exclude_misc: bool) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for record in records {
        if exclude_misc && record.is_misc() {
            continue;
        }
        let name = record.activity().as_str();
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}
