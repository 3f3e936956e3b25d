//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Seconds elapsed between two timestamps, negative if `later` is actually
/// earlier than `earlier`.
pub fn seconds_between(
    earlier: &chrono::DateTime<chrono::Utc>,
    later: &chrono::DateTime<chrono::Utc>
) -> Option<f64> {
    duration_to_seconds(*later - *earlier)
}
