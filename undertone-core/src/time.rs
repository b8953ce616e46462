//! Duration conversion helpers for the snapshot and query boundaries.
//!
//! Playback positions cross the transport boundary as `f64` seconds while
//! lyric timing is kept as `Duration`; these helpers keep the conversions in
//! one place with explicit saturation behavior.

use std::time::Duration;

/// Extension trait for safe `Duration` conversions.
pub trait DurationExt {
    /// Convert duration to whole seconds as u32, saturating at `u32::MAX`.
    ///
    /// Always safe for audio tracks: `u32::MAX` seconds is ~136 years.
    fn as_secs_u32(&self) -> u32;

    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }

    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Build a `Duration` from `f64` seconds, treating NaN and negatives as zero.
///
/// Transport position ticks are not trusted to be well-formed.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_secs_u32() {
        assert_eq!(Duration::from_secs(300).as_secs_u32(), 300);
        assert_eq!(Duration::ZERO.as_secs_u32(), 0);
    }

    #[test]
    fn test_as_secs_u32_saturates() {
        let duration = Duration::from_secs(u64::from(u32::MAX) + 1);
        assert_eq!(duration.as_secs_u32(), u32::MAX);
    }

    #[test]
    fn test_as_millis_u64() {
        assert_eq!(Duration::from_millis(1234).as_millis_u64(), 1234);
    }

    #[test]
    fn test_duration_from_secs_rejects_garbage() {
        assert_eq!(duration_from_secs(-1.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(2.5), Duration::from_millis(2500));
    }
}
