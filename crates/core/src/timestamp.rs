//! Timestamp type for recorded frames
//!
//! Timestamps are stored as nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC)
//! in a signed 64-bit integer, which is exactly what the frame header carries.
//! This provides:
//! - Nanosecond resolution for ordering captured traffic
//! - Roughly ±292 years of range around the epoch
//!
//! ## Usage
//!
//! ```
//! use dumpstore_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_nanos = Timestamp::from_nanos(1_000_000_000);
//! assert_eq!(from_nanos.as_secs(), 1);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanosecond-precision wall-clock timestamp
///
/// ## Invariants
///
/// - Timestamps are always in nanoseconds since Unix epoch
/// - Values before the epoch are negative
/// - Timestamps are comparable and orderable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Uses system time. A clock set before the epoch yields a negative value;
    /// a clock beyond the representable range saturates.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Create a timestamp from nanoseconds since epoch
    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Timestamp(nanos)
    }

    /// Convert a `SystemTime`, saturating at the `i64` range
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp(i64::try_from(after.as_nanos()).unwrap_or(i64::MAX)),
            Err(before) => {
                let nanos = i64::try_from(before.duration().as_nanos()).unwrap_or(i64::MAX);
                Timestamp(-nanos)
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get nanoseconds since Unix epoch
    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Get whole seconds since Unix epoch (rounds toward negative infinity)
    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.0.div_euclid(1_000_000_000)
    }

    /// Convert back to a `SystemTime`
    pub fn to_system_time(&self) -> SystemTime {
        if self.0 >= 0 {
            UNIX_EPOCH + Duration::from_nanos(self.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(self.0.unsigned_abs())
        }
    }

    /// Compute duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        let delta = self.0.checked_sub(earlier.0)?;
        u64::try_from(delta).ok().map(Duration::from_nanos)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // "seconds.nanoseconds"
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000);
        write!(f, "{}.{:09}", secs, nanos)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Timestamp::from_system_time(time)
    }
}

impl From<Timestamp> for i64 {
    /// Extract raw nanoseconds
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_epoch() {
        assert_eq!(Timestamp::EPOCH.as_nanos(), 0);
        assert_eq!(Timestamp::EPOCH.as_secs(), 0);
        assert_eq!(Timestamp::default(), Timestamp::EPOCH);
    }

    #[test]
    fn test_timestamp_now_advances() {
        let before = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let after = Timestamp::now();

        assert!(after > before, "Time should advance");
        assert!(after.duration_since(before).unwrap() >= Duration::from_millis(1));
    }

    #[test]
    fn test_timestamp_system_time_roundtrip() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let ts = Timestamp::from(time);
        assert_eq!(ts.as_nanos(), 1_700_000_000_123_456_789);
        assert_eq!(ts.to_system_time(), time);
    }

    #[test]
    fn test_timestamp_before_epoch() {
        let time = UNIX_EPOCH - Duration::from_nanos(1_500_000_000);
        let ts = Timestamp::from_system_time(time);
        assert_eq!(ts.as_nanos(), -1_500_000_000);
        assert_eq!(ts.as_secs(), -2);
        assert_eq!(ts.to_system_time(), time);
        assert_eq!(ts.to_string(), "-2.500000000");
    }

    #[test]
    fn test_timestamp_duration_since() {
        let t1 = Timestamp::from_nanos(1_000);
        let t2 = Timestamp::from_nanos(3_500);

        assert_eq!(t2.duration_since(t1), Some(Duration::from_nanos(2_500)));
        assert!(t1.duration_since(t2).is_none());
    }

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::from_nanos(1_000_000_042);
        assert_eq!(ts.to_string(), "1.000000042");
    }
}
