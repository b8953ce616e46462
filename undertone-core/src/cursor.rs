//! Active-line derivation for lyric display.
//!
//! This is a pure function re-evaluated from scratch on every position
//! update; that full re-derivation is the correctness anchor. Any
//! incremental tracking a renderer adds must never diverge from it.

use crate::lrc::LyricSet;
use crate::time::duration_from_secs;

/// Index of the lyric line active at `position_secs`.
///
/// - `None` for an empty set.
/// - Synced: the last line whose time is at or before the position; the
///   first line while the position is still ahead of it.
/// - Unsynced: the track duration is divided into one bucket per line and
///   the position's bucket is returned, clamped to the last line.
///
/// For a fixed set and non-decreasing positions the result is monotonically
/// non-decreasing.
#[must_use]
pub fn active_index(lyrics: &LyricSet, position_secs: f64, duration_secs: f64) -> Option<usize> {
    if lyrics.is_empty() {
        return None;
    }

    if lyrics.synced {
        let position = duration_from_secs(position_secs);
        let last_reached = lyrics
            .lines
            .iter()
            .rposition(|line| line.time <= position);
        return Some(last_reached.unwrap_or(0));
    }

    let count = lyrics.len();
    if duration_secs <= 0.0 || !position_secs.is_finite() {
        return Some(0);
    }

    let fraction = (position_secs / duration_secs).clamp(0.0, 1.0);
    // One bucket per line; the final clamp covers position == duration.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = ((fraction * count as f64).floor() as usize).min(count - 1);
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::{LyricSet, LyricSource};

    fn synced_set() -> LyricSet {
        LyricSet::parse_synced(
            "[00:05.00]First\n[00:10.00]Second\n[00:15.00]Third",
            LyricSource::ThirdParty,
        )
        .unwrap()
    }

    fn plain_set(lines: usize) -> LyricSet {
        let text: Vec<String> = (0..lines).map(|i| format!("Line {i}")).collect();
        LyricSet::from_plain(&text.join("\n"), LyricSource::Server)
    }

    #[test]
    fn test_empty_set_has_no_active_line() {
        let set = LyricSet::from_plain("", LyricSource::Server);
        assert_eq!(active_index(&set, 10.0, 180.0), None);
    }

    #[test]
    fn test_synced_before_first_line_returns_zero() {
        assert_eq!(active_index(&synced_set(), 2.0, 180.0), Some(0));
    }

    #[test]
    fn test_synced_picks_last_reached_line() {
        let set = synced_set();
        assert_eq!(active_index(&set, 5.0, 180.0), Some(0));
        assert_eq!(active_index(&set, 9.9, 180.0), Some(0));
        assert_eq!(active_index(&set, 12.0, 180.0), Some(1));
        assert_eq!(active_index(&set, 60.0, 180.0), Some(2));
    }

    #[test]
    fn test_unsynced_even_distribution() {
        let set = plain_set(4);
        assert_eq!(active_index(&set, 0.0, 100.0), Some(0));
        assert_eq!(active_index(&set, 26.0, 100.0), Some(1));
        assert_eq!(active_index(&set, 51.0, 100.0), Some(2));
        assert_eq!(active_index(&set, 99.0, 100.0), Some(3));
        // Position at (or past) the end clamps to the last line.
        assert_eq!(active_index(&set, 100.0, 100.0), Some(3));
        assert_eq!(active_index(&set, 140.0, 100.0), Some(3));
    }

    #[test]
    fn test_unsynced_zero_duration() {
        let set = plain_set(3);
        assert_eq!(active_index(&set, 42.0, 0.0), Some(0));
    }

    #[test]
    fn test_monotonic_over_forward_playback() {
        let sets = [synced_set(), plain_set(7)];
        for set in &sets {
            let mut last = 0usize;
            let mut position = 0.0;
            while position <= 180.0 {
                let index = active_index(set, position, 180.0).unwrap();
                assert!(index >= last, "cursor moved backward at {position}");
                last = index;
                position += 0.25;
            }
        }
    }
}
