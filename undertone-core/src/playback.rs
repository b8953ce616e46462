use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Repeat behavior applied when a track finishes or the queue runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Advance to the next mode: Off -> All -> One -> Off.
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Shuffle/repeat toggles, set only by explicit user intent.
///
/// Persists across track transitions within a session; not persisted across
/// restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShuffleRepeatConfig {
    pub shuffled: bool,
    pub repeat: RepeatMode,
}

/// Immutable snapshot of the playback state, recomputed on every transport
/// event and sequencer transition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub is_muted: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Position tolerance below which two snapshots count as identical.
pub const POSITION_TOLERANCE_SECS: f64 = 0.4;

impl PlaybackState {
    /// Snapshot with full volume and nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Self::default()
        }
    }

    /// Position clamped into `[0, duration]` whenever a duration is known.
    ///
    /// The transport is responsible for real clamping; this is defensive.
    #[must_use]
    pub fn clamped_position(&self) -> f64 {
        let position = self.position_secs.max(0.0);
        if self.duration_secs > 0.0 {
            position.min(self.duration_secs)
        } else {
            position
        }
    }

    /// Check whether the current track differs from `other`'s.
    #[must_use]
    pub fn track_changed(&self, other: &Self) -> bool {
        match (&self.current_track, &other.current_track) {
            (Some(a), Some(b)) => a.id != b.id,
            (None, None) => false,
            _ => true,
        }
    }

    /// Whether `other` carries no information a consumer could act on beyond
    /// what this snapshot already said, within the position tolerance.
    #[must_use]
    pub fn is_redundant_with(&self, other: &Self) -> bool {
        !self.track_changed(other)
            && self.is_playing == other.is_playing
            && self.is_muted == other.is_muted
            && self.is_loading == other.is_loading
            && self.error == other.error
            && (self.volume - other.volume).abs() < f32::EPSILON
            && (self.duration_secs - other.duration_secs).abs() < f64::EPSILON
            && (self.position_secs - other.position_secs).abs() < POSITION_TOLERANCE_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::tests::make_track;

    #[test]
    fn test_repeat_cycle_order() {
        assert_eq!(RepeatMode::Off.cycle(), RepeatMode::All);
        assert_eq!(RepeatMode::All.cycle(), RepeatMode::One);
        assert_eq!(RepeatMode::One.cycle(), RepeatMode::Off);
    }

    #[test]
    fn test_clamped_position() {
        let state = PlaybackState {
            position_secs: 250.0,
            duration_secs: 200.0,
            ..PlaybackState::new()
        };
        assert!((state.clamped_position() - 200.0).abs() < f64::EPSILON);

        let state = PlaybackState {
            position_secs: -3.0,
            duration_secs: 0.0,
            ..PlaybackState::new()
        };
        assert!(state.clamped_position().abs() < f64::EPSILON);
    }

    #[test]
    fn test_track_changed() {
        let a = PlaybackState {
            current_track: Some(make_track("1")),
            ..PlaybackState::new()
        };
        let b = PlaybackState {
            current_track: Some(make_track("2")),
            ..PlaybackState::new()
        };
        let none = PlaybackState::new();

        assert!(a.track_changed(&b));
        assert!(a.track_changed(&none));
        assert!(!none.track_changed(&none));
        assert!(!a.track_changed(&a.clone()));
    }

    #[test]
    fn test_redundancy_within_position_tolerance() {
        let a = PlaybackState {
            current_track: Some(make_track("1")),
            is_playing: true,
            position_secs: 10.0,
            duration_secs: 180.0,
            ..PlaybackState::new()
        };
        let mut b = a.clone();
        b.position_secs = 10.3;
        assert!(a.is_redundant_with(&b));

        b.position_secs = 10.5;
        assert!(!a.is_redundant_with(&b));

        b.position_secs = 10.0;
        b.is_playing = false;
        assert!(!a.is_redundant_with(&b));
    }
}
