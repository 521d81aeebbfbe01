//! Human-readable duration formatting.

/// Formats milliseconds as zero-padded `HH:MM:SS`.
///
/// Hours are not capped at 24. Negative input formats as zero.
pub fn format_duration(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
