//! Clock abstraction and datetime formatting.
//!
//! Lifecycle services never call `Utc::now()` directly; they read time from an
//! injected [`Clock`] so tests can pin it.

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format a DateTime as an RFC 3339 string with millisecond precision.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use ticketing_common::datetime::format_datetime;
///
/// let dt = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
/// assert_eq!(format_datetime(&dt), "2025-06-01T09:30:00.000Z");
/// ```
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }

    #[test]
    fn test_format_datetime() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 1, 12, 30, 45).unwrap();
        assert_eq!(format_datetime(&dt), "2023-12-01T12:30:45.000Z");
    }
}
