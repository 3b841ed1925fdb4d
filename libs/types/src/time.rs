//! Timestamp normalization
//!
//! All timestamps inside the core are Unix nanoseconds (i64, UTC). Callers
//! holding timezone-aware wall-clock times convert at the boundary so every
//! comparison inside the core is over one monotonic axis.

use chrono::{DateTime, TimeZone, Utc};

/// Convert a timezone-aware datetime to UTC Unix nanoseconds.
///
/// Saturates at `i64::MAX` for dates beyond the nanosecond range (year 2262).
pub fn nanos_from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    dt.with_timezone(&Utc)
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

/// Convert UTC Unix nanoseconds back to a chrono datetime.
pub fn datetime_from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}
