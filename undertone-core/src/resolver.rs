//! Lyric resolution: server source first, then the provider chain, with a
//! single-slot cache keyed by track id.
//!
//! The cache holds at most one entry — the current track — including
//! definitive "no lyrics" negatives, so a track with known-absent lyrics is
//! never re-fetched while it stays current. Resolving a different track id
//! evicts everything else first.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lrc::{has_time_tags, LyricSet, LyricSource};
use crate::playback::PlaybackState;
use crate::provider::{LyricsProvider, LyricsQuery, LyricsResult, ServerLyrics};
use crate::time::DurationExt;
use crate::track::Track;

const LOG_TARGET: &str = "undertone::resolver";

/// Events emitted as resolutions complete.
#[derive(Debug, Clone)]
pub enum LyricsEvent {
    Loaded {
        track_id: String,
        lyrics: Arc<LyricSet>,
    },
    /// Definitive negative: every source was exhausted.
    NotFound { track_id: String },
}

#[derive(Debug, Clone)]
struct CacheSlot {
    track_id: String,
    /// `None` is a cached negative.
    lyrics: Option<Arc<LyricSet>>,
}

/// Resolves and caches lyrics for the currently playing track.
pub struct LyricResolver {
    server: Arc<dyn ServerLyrics>,
    providers: Vec<Box<dyn LyricsProvider>>,
    cache: Mutex<Option<CacheSlot>>,
    /// Track id of the most recently requested resolution; a result whose
    /// id no longer matches is stale and must not be installed.
    current: Mutex<Option<String>>,
    event_tx: broadcast::Sender<LyricsEvent>,
}

impl LyricResolver {
    #[must_use]
    pub fn new(server: Arc<dyn ServerLyrics>, providers: Vec<Box<dyn LyricsProvider>>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            server,
            providers,
            cache: Mutex::new(None),
            current: Mutex::new(None),
            event_tx,
        }
    }

    /// Subscribe to resolution events.
    pub fn subscribe(&self) -> broadcast::Receiver<LyricsEvent> {
        self.event_tx.subscribe()
    }

    /// Drop the cached entry, if any.
    pub async fn prune(&self) {
        *self.cache.lock().await = None;
    }

    /// Resolve lyrics for `track`, consulting the cache first.
    pub async fn resolve_track(&self, track: &Track) -> Option<Arc<LyricSet>> {
        let mut query = LyricsQuery::new(&track.id, &track.title, &track.artist)
            .with_album(&track.album);
        if track.duration_secs > 0.0 {
            query = query
                .with_duration(crate::time::duration_from_secs(track.duration_secs).as_secs_u32());
        }
        self.resolve(&query).await
    }

    /// Resolve lyrics for a query.
    ///
    /// Network failures on individual sources are absorbed; only total
    /// exhaustion yields `None`, which is itself cached as a negative.
    pub async fn resolve(&self, query: &LyricsQuery) -> Option<Arc<LyricSet>> {
        {
            let mut cache = self.cache.lock().await;
            match cache.as_ref() {
                Some(slot) if slot.track_id == query.track_id => {
                    debug!(target: LOG_TARGET, "cache hit for {}", query.track_id);
                    let lyrics = slot.lyrics.clone();
                    // Re-announce so late subscribers converge too.
                    let event = match &lyrics {
                        Some(set) => LyricsEvent::Loaded {
                            track_id: slot.track_id.clone(),
                            lyrics: set.clone(),
                        },
                        None => LyricsEvent::NotFound {
                            track_id: slot.track_id.clone(),
                        },
                    };
                    let _ = self.event_tx.send(event);
                    return lyrics;
                }
                Some(_) => {
                    // Single slot: a fetch for a new track evicts everything
                    // else before any network call.
                    *cache = None;
                }
                None => {}
            }
        }

        *self.current.lock().await = Some(query.track_id.clone());

        info!(
            target: LOG_TARGET,
            "resolving lyrics for {} - {} ({})", query.artist, query.title, query.track_id
        );

        let found = match self.fetch_from_server(query).await {
            Some(set) => Some(set),
            None => self.fetch_from_providers(query).await,
        }
        .map(Arc::new);

        let installed = self.install(query, found.clone()).await;
        if !installed {
            // The current track moved on while we were fetching; a late
            // result for the wrong key is discarded, not installed.
            debug!(
                target: LOG_TARGET,
                "discarding stale resolution for {}", query.track_id
            );
            return None;
        }

        match &found {
            Some(lyrics) => {
                let _ = self.event_tx.send(LyricsEvent::Loaded {
                    track_id: query.track_id.clone(),
                    lyrics: lyrics.clone(),
                });
            }
            None => {
                info!(
                    target: LOG_TARGET,
                    "no lyrics found for {} - {}", query.artist, query.title
                );
                let _ = self.event_tx.send(LyricsEvent::NotFound {
                    track_id: query.track_id.clone(),
                });
            }
        }

        found
    }

    /// Watch the playback state feed and resolve lyrics on track changes.
    pub async fn run(
        self: Arc<Self>,
        mut states: broadcast::Receiver<PlaybackState>,
        cancel: CancellationToken,
    ) {
        info!(target: LOG_TARGET, "lyric resolver listening for track changes");
        let mut last_track_id: Option<String> = None;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(target: LOG_TARGET, "lyric resolver shutting down");
                    break;
                }
                state = states.recv() => {
                    match state {
                        Ok(snapshot) => {
                            let Some(track) = snapshot.current_track else { continue };
                            if last_track_id.as_deref() == Some(track.id.as_str()) {
                                continue;
                            }
                            last_track_id = Some(track.id.clone());
                            self.resolve_track(&track).await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                    }
                }
            }
        }
    }

    async fn fetch_from_server(&self, query: &LyricsQuery) -> Option<LyricSet> {
        let raw = match self
            .server
            .fetch_server_lyrics(&query.artist, &query.title)
            .await
        {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => return None,
            Err(e) => {
                warn!(target: LOG_TARGET, "server lyrics failed: {e}");
                return None;
            }
        };

        if !looks_like_lyrics(&raw) {
            debug!(
                target: LOG_TARGET,
                "server text for {} rejected as boilerplate", query.track_id
            );
            return None;
        }

        if has_time_tags(&raw) {
            match LyricSet::parse_synced(&raw, LyricSource::Server) {
                Ok(set) => return Some(set),
                Err(e) => {
                    warn!(target: LOG_TARGET, "server lyrics unparsable as synced: {e}");
                }
            }
        }

        let set = LyricSet::from_plain(&raw, LyricSource::Server);
        if set.is_empty() {
            None
        } else {
            Some(set)
        }
    }

    async fn fetch_from_providers(&self, query: &LyricsQuery) -> Option<LyricSet> {
        let mut plain_fallback: Option<LyricSet> = None;

        for provider in &self.providers {
            debug!(target: LOG_TARGET, "trying provider {}", provider.name());
            match provider.fetch(query).await {
                Ok(LyricsResult::Synced(set)) => {
                    info!(
                        target: LOG_TARGET,
                        "{} returned synced lyrics ({} lines)",
                        provider.name(),
                        set.len()
                    );
                    return Some(set);
                }
                Ok(LyricsResult::Unsynced(set)) => {
                    if plain_fallback.is_none() && !set.is_empty() {
                        plain_fallback = Some(set);
                    }
                }
                Ok(LyricsResult::NotFound) => {
                    debug!(target: LOG_TARGET, "{} had no lyrics", provider.name());
                }
                Err(e) => {
                    // Provider failure is not user-facing; fall through.
                    warn!(target: LOG_TARGET, "provider {} failed: {e}", provider.name());
                }
            }
        }

        plain_fallback
    }

    /// Install a result keyed by the id captured at request time. Returns
    /// false when a newer resolution has superseded this one.
    async fn install(&self, query: &LyricsQuery, lyrics: Option<Arc<LyricSet>>) -> bool {
        let current = self.current.lock().await;
        if current.as_deref() != Some(query.track_id.as_str()) {
            return false;
        }
        let mut cache = self.cache.lock().await;
        *cache = Some(CacheSlot {
            track_id: query.track_id.clone(),
            lyrics,
        });
        true
    }

    #[cfg(test)]
    async fn cached_entry(&self) -> Option<(String, bool)> {
        self.cache
            .lock()
            .await
            .as_ref()
            .map(|slot| (slot.track_id.clone(), slot.lyrics.is_some()))
    }
}

/// Phrases that mark provider boilerplate rather than lyric content.
const BOILERPLATE_PHRASES: &[&str] = &[
    "lyrics provided by",
    "lyrics by",
    "written by",
    "composed by",
    "courtesy of",
    "all rights reserved",
    "instrumental",
];

/// Reject provider boilerplate masquerading as lyrics: too few lines, too
/// little text, or short text dominated by credit phrases.
#[must_use]
pub fn looks_like_lyrics(text: &str) -> bool {
    let trimmed = text.trim();
    let lines: Vec<&str> = trimmed.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.len() < 4 || trimmed.chars().count() < 100 {
        return false;
    }

    if trimmed.chars().count() < 200 {
        let lower = trimmed.to_lowercase();
        let credit_lines = lines
            .iter()
            .filter(|l| {
                let l = l.to_lowercase();
                BOILERPLATE_PHRASES.iter().any(|p| l.contains(p))
            })
            .count();
        let dominated = credit_lines * 2 >= lines.len()
            || BOILERPLATE_PHRASES.iter().filter(|p| lower.contains(*p)).count() >= 2;
        if dominated {
            return false;
        }
    }

    true
}
