//! Wall-clock timestamps for captured output.
//!
//! Timestamps are stored as seconds + nanoseconds since the Unix epoch so the
//! encoding is byte-stable across platforms. Pacing during replay is derived
//! from the difference between two timestamps.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall clock timestamp of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch
    pub seconds: u64,
    /// Sub-second nanoseconds
    pub nanos: u32,
}

impl Timestamp {
    /// Maximum nanoseconds per second
    pub const NANOS_PER_SEC: u32 = 1_000_000_000;

    /// Layout used for the human-readable prefix (`Jan  2 15:04:05`)
    pub const STAMP_FORMAT: &'static str = "%b %e %H:%M:%S";

    /// Create a new timestamp
    #[must_use]
    pub fn new(seconds: u64, nanos: u32) -> Self {
        Self {
            seconds: seconds + u64::from(nanos / Self::NANOS_PER_SEC),
            nanos: nanos % Self::NANOS_PER_SEC,
        }
    }

    /// Current wall-clock time
    ///
    /// A clock set before the epoch reads as the epoch.
    #[must_use]
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from(since_epoch)
    }

    /// Milliseconds since the epoch
    #[must_use]
    pub const fn as_millis(&self) -> u128 {
        self.seconds as u128 * 1_000 + self.nanos as u128 / 1_000_000
    }

    /// Elapsed time since `earlier`, clamped to zero when `earlier` is later
    #[must_use]
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        self.as_duration()
            .checked_sub(earlier.as_duration())
            .unwrap_or(Duration::ZERO)
    }

    /// Timestamp shifted forward by `duration`
    #[must_use]
    pub fn add(&self, duration: Duration) -> Self {
        Self::from(self.as_duration() + duration)
    }

    /// Render with [`Self::STAMP_FORMAT`] in the local time zone
    #[must_use]
    pub fn format_stamp(&self) -> String {
        self.to_local().format(Self::STAMP_FORMAT).to_string()
    }

    /// Convert to a local chrono date-time
    #[must_use]
    pub fn to_local(&self) -> DateTime<Local> {
        let secs = i64::try_from(self.seconds).unwrap_or(i64::MAX);
        DateTime::from_timestamp(secs, self.nanos)
            .unwrap_or_default()
            .with_timezone(&Local)
    }

    fn as_duration(&self) -> Duration {
        Duration::new(self.seconds, self.nanos)
    }
}

impl From<Duration> for Timestamp {
    fn from(since_epoch: Duration) -> Self {
        Self {
            seconds: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t1 = Timestamp::new(100, 500_000_000);
        let t2 = Timestamp::new(102, 200_000_000);

        let duration = t2.duration_since(&t1);
        assert_eq!(duration, Duration::from_millis(1_700));

        let t3 = t1.add(duration);
        assert_eq!(t3, t2);
    }

    #[test]
    fn test_duration_since_clamps_backwards() {
        let earlier = Timestamp::new(10, 0);
        let later = Timestamp::new(11, 0);
        assert_eq!(earlier.duration_since(&later), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_nano_overflow() {
        let t = Timestamp::new(100, 900_000_000).add(Duration::from_millis(200));
        assert_eq!(t.seconds, 101);
        assert_eq!(t.nanos, 100_000_000);

        let normalized = Timestamp::new(1, 2_500_000_000);
        assert_eq!(normalized, Timestamp::new(3, 500_000_000));
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp::new(1, 999_999_999) < Timestamp::new(2, 0));
        assert!(Timestamp::now() > Timestamp::new(0, 0));
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(Timestamp::new(2, 345_000_000).as_millis(), 2_345);
    }

    #[test]
    fn test_format_stamp_shape() {
        // "Mon dd hh:mm:ss" regardless of the local zone
        let stamp = Timestamp::new(1_700_000_000, 0).format_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.matches(':').count(), 2);
    }
}
