//! Message contract for secondary render surfaces (detached mini-player and
//! friends).
//!
//! The wire is a best-effort, unordered pub/sub topic; every state message
//! is a full snapshot so a dropped or reordered message self-heals on the
//! next tick. The message set is closed and validated at the boundary.

use crate::error::Result;
use crate::playback::PlaybackState;
use crate::track::Track;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How many upcoming tracks a state message previews.
pub const UP_NEXT_PREVIEW_LEN: usize = 3;

/// Command vocabulary accepted from secondary surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceAction {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Seek,
}

/// Messages crossing the surface boundary, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    /// Primary -> secondary: full state snapshot.
    AudioState {
        current_track: Option<Track>,
        is_playing: bool,
        position_secs: f64,
        duration_secs: f64,
        /// First few queue entries, bounded to [`UP_NEXT_PREVIEW_LEN`].
        up_next: Vec<Track>,
    },
    /// Secondary -> primary: a playback intent.
    Command {
        action: SurfaceAction,
        /// Seek position in seconds; unused by the other actions.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<f64>,
    },
    /// Secondary -> primary: ask for an immediate snapshot instead of
    /// waiting for the next tick.
    RequestState,
}

impl SurfaceMessage {
    /// Build a state message from a snapshot and queue preview.
    #[must_use]
    pub fn from_snapshot(snapshot: &PlaybackState, up_next: &[Track]) -> Self {
        Self::AudioState {
            current_track: snapshot.current_track.clone(),
            is_playing: snapshot.is_playing,
            position_secs: snapshot.clamped_position(),
            duration_secs: snapshot.duration_secs,
            up_next: up_next.iter().take(UP_NEXT_PREVIEW_LEN).cloned().collect(),
        }
    }
}

/// Outbound half of the surface channel, supplied by the shell.
///
/// Implementations must tolerate zero subscribers; the publisher absorbs and
/// logs errors rather than propagating them.
#[async_trait]
pub trait SurfaceSink: Send + Sync {
    /// Deliver one message to whoever is listening.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying channel rejected the message.
    async fn send(&self, message: &SurfaceMessage) -> Result<()>;
}
