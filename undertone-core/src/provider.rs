//! Lyric acquisition capabilities and the query they share.

use crate::error::Result;
use crate::lrc::LyricSet;
use async_trait::async_trait;

/// Query parameters for fetching lyrics.
#[derive(Debug, Clone)]
pub struct LyricsQuery {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Duration hint in seconds, used by providers for candidate matching.
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    pub fn new(track_id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_secs: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Title with release qualifiers stripped, for fuzzy search.
    #[must_use]
    pub fn simplified_title(&self) -> String {
        simplify_title(&self.title)
    }

    /// Primary artist only, for fuzzy search.
    #[must_use]
    pub fn simplified_artist(&self) -> String {
        simplify_artist(&self.artist)
    }
}

/// Result from a lyrics provider.
#[derive(Debug, Clone)]
pub enum LyricsResult {
    /// Time-tagged lyrics.
    Synced(LyricSet),
    /// Plain text without timing.
    Unsynced(LyricSet),
    NotFound,
}

impl LyricsResult {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    /// Unwrap into a lyric set when one was found.
    #[must_use]
    pub fn into_set(self) -> Option<LyricSet> {
        match self {
            Self::Synced(set) | Self::Unsynced(set) => Some(set),
            Self::NotFound => None,
        }
    }
}

/// Third-party lyric capability.
///
/// Implementations search by free text and by exact fields; failures are
/// absorbed by the resolver, which falls through to the next provider in
/// its chain.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch lyrics for a query.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider could not be queried; "queried
    /// fine but found nothing" is [`LyricsResult::NotFound`], not an error.
    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsResult>;
}

/// The music server's own lyric endpoint, injected by the REST layer.
#[async_trait]
pub trait ServerLyrics: Send + Sync {
    /// Fetch raw lyric text for an artist/title pair, if the server has any.
    ///
    /// # Errors
    ///
    /// Returns an error on transport problems; an absent lyric is `None`.
    async fn fetch_server_lyrics(&self, artist: &str, title: &str) -> Result<Option<String>>;
}

/// Strip parenthetical/bracketed qualifiers and featured-artist suffixes
/// from a track title: `"Song (Remastered 2011) [feat. X]"` -> `"Song"`.
#[must_use]
pub fn simplify_title(title: &str) -> String {
    let stripped = strip_bracketed(title);
    let cut = cut_at_any(&stripped, &[" feat. ", " feat ", " ft. ", " ft "]);
    collapse_whitespace(cut)
}

/// Reduce an artist credit to the primary artist:
/// `"A feat. B"` / `"A & B"` / `"A, B"` -> `"A"`.
#[must_use]
pub fn simplify_artist(artist: &str) -> String {
    let stripped = strip_bracketed(artist);
    let cut = cut_at_any(&stripped, &[" feat. ", " feat ", " ft. ", " ft ", " & ", ", "]);
    collapse_whitespace(cut)
}

fn strip_bracketed(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn cut_at_any<'a>(s: &'a str, markers: &[&str]) -> &'a str {
    // ASCII lowering keeps byte offsets valid for slicing the original.
    let lower = s.to_ascii_lowercase();
    let mut end = s.len();
    for marker in markers {
        if let Some(pos) = lower.find(marker) {
            end = end.min(pos);
        }
    }
    &s[..end]
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
