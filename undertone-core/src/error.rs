use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Transport errors
    #[error("Transport failed to load '{track_id}': {reason}")]
    TransportLoadFailed { track_id: String, reason: String },

    #[error("Transport command failed: {reason}")]
    TransportCommandFailed { reason: String },

    // Lyrics errors
    #[error("Lyrics not found for track: {track} by {artist}")]
    LyricsNotFound { track: String, artist: String },

    #[error("Lyrics provider {provider} failed: {reason}")]
    LyricsProviderFailed { provider: String, reason: String },

    #[error("Failed to parse LRC: {reason}")]
    LrcParseError { reason: String },

    // Surface broadcast errors
    #[error("Surface broadcast failed: {reason}")]
    SurfaceBroadcastFailed { reason: String },

    #[error("Failed to encode surface message: {0}")]
    SurfaceEncodeError(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
