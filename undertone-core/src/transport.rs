//! Transport capability: the audio decode/output engine consumed by the core.
//!
//! The engine itself (decode pipeline, device handling) lives elsewhere; the
//! sequencer only issues these commands and folds the event feed into state.

use crate::error::Result;
use crate::track::Track;
use async_trait::async_trait;

/// Commands accepted by the audio engine.
///
/// Implementations must not block: `load` queues work and reports failure
/// either through its return value or a later [`TransportEvent::Error`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Load `track` from `source_url`, replacing whatever is playing.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejected the load outright.
    async fn load(&self, track: &Track, source_url: &str) -> Result<()>;

    /// Begin or resume playback of the loaded track.
    ///
    /// # Errors
    ///
    /// Returns an error if playback could not start.
    async fn play(&self) -> Result<()>;

    async fn pause(&self);

    async fn seek(&self, position_secs: f64);

    /// Set output volume in `[0, 1]`.
    async fn set_volume(&self, volume: f32);

    async fn toggle_mute(&self);

    /// Stop playback and unload the current track.
    async fn stop(&self);
}

/// Events emitted by the audio engine, delivered to the sequencer's
/// serialization point.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Periodic position tick in seconds.
    PositionTick(f64),
    /// Track metadata became available; carries the duration in seconds.
    LoadedMetadata(f64),
    /// The track played to its natural end.
    Ended,
    /// The engine failed; playback has stopped.
    Error(String),
    /// The engine is buffering.
    Waiting,
    /// Enough data is buffered to play.
    CanPlay,
    Play,
    Pause,
}

/// Produces a streamable URL for a track.
///
/// For Subsonic-family servers the stream URL is derived from the track id
/// plus connection parameters, so this is synchronous; the REST client
/// supplies the implementation.
pub trait StreamUrlSource: Send + Sync {
    fn stream_url(&self, track: &Track) -> String;
}

impl<F> StreamUrlSource for F
where
    F: Fn(&Track) -> String + Send + Sync,
{
    fn stream_url(&self, track: &Track) -> String {
        self(track)
    }
}
