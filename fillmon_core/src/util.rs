//! Common rounding/time helpers for fillmon_core.

use chrono::{DateTime, Utc};

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: i64 = 1_000;
/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: f64 = 60_000.0;

/// Round to two decimals, ties away from zero. Non-finite values pass through.
#[inline]
pub fn round2(v: f64) -> f64 {
    if v.is_finite() {
        (v * 100.0).round() / 100.0
    } else {
        v
    }
}

/// Milliseconds since the Unix epoch.
#[inline]
pub fn epoch_ms(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

/// Whole seconds from `start` to `end`, floored. Zero when `end` precedes `start`.
#[inline]
pub fn whole_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let ms = (end - start).num_milliseconds().max(0);
    (ms / MILLIS_PER_SEC) as u64
}

/// Fractional minutes from `start` to `end`. Zero when `end` precedes `start`.
#[inline]
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = (end - start).num_milliseconds().max(0);
    ms as f64 / MILLIS_PER_MIN
}
