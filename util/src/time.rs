//! General time utility functions

use chrono::{DateTime, Utc};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a UTC time into floating point seconds since the unix epoch.
///
/// This is the time base used by the detection producer for record timestamps.
pub fn utc_to_epoch_s(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64
        + time.timestamp_subsec_nanos() as f64 / NANOS_PER_SECOND as f64
}

/// Current wall-clock time in seconds since the unix epoch.
pub fn now_epoch_s() -> f64 {
    utc_to_epoch_s(&Utc::now())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_utc_to_epoch_s() {
        let t = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        assert!((utc_to_epoch_s(&t) - 1_700_000_000.25).abs() < 1e-6);

        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }
}
