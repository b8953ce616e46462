pub mod config;
pub mod cursor;
pub mod error;
pub mod lrc;
pub mod playback;
pub mod provider;
pub mod publisher;
pub mod queue;
pub mod resolver;
pub mod sequencer;
pub mod surface;
pub mod time;
pub mod track;
pub mod transport;

pub use config::{build_config_template, CoreConfig, LyricsConfig, LyricsProviderType, PlaybackConfig};
pub use cursor::active_index;
pub use error::{CoreError, Result};
pub use lrc::{has_time_tags, LyricLine, LyricSet, LyricSource};
pub use playback::{PlaybackState, RepeatMode, ShuffleRepeatConfig, POSITION_TOLERANCE_SECS};
pub use provider::{
    simplify_artist, simplify_title, LyricsProvider, LyricsQuery, LyricsResult, ServerLyrics,
};
pub use publisher::StatePublisher;
pub use queue::{History, PlayQueue};
pub use resolver::{looks_like_lyrics, LyricResolver, LyricsEvent};
pub use sequencer::Sequencer;
pub use surface::{SurfaceAction, SurfaceMessage, SurfaceSink, UP_NEXT_PREVIEW_LEN};
pub use time::{duration_from_secs, DurationExt};
pub use track::Track;
pub use transport::{StreamUrlSource, Transport, TransportEvent};
