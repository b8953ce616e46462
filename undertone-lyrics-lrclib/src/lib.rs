//! LRCLIB implementation of the third-party lyric capability.
//!
//! Query order follows the resolver's fallback design: the tolerant search
//! endpoint first, queried with normalized title/artist (release qualifiers
//! and featured artists stripped), then the exact-match `get` endpoint as a
//! second attempt. Time-tagged candidates win over plain ones.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use undertone_core::{
    CoreError, LyricSet, LyricSource, LyricsProvider, LyricsQuery, LyricsResult,
};

const LOG_TARGET: &str = "undertone::provider::lrclib";
const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Candidates further than this from the duration hint are not considered.
const DURATION_TOLERANCE_SECS: f64 = 5.0;

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default timeout and retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Provider pointed at a specific API root (tests, mirrors).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("undertone/0.1 (https://github.com/undertone/undertone)")
            .build()
            .map_err(|e| provider_error(format!("failed to build HTTP client: {e}")))?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Vec<LrclibResponse>, CoreError> {
        let free_text = format!("{} {}", query.simplified_artist(), query.simplified_title());
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&free_text)
        );
        debug!(target: LOG_TARGET, "search request: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| provider_error(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(provider_error(format!(
                "search returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| provider_error(format!("search response unreadable: {e}")))
    }

    async fn get_exact(&self, query: &LyricsQuery) -> Result<Option<LrclibResponse>, CoreError> {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist),
            urlencoding::encode(&query.title)
        );
        if let Some(ref album) = query.album {
            use std::fmt::Write;
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }
        if let Some(duration) = query.duration_secs {
            use std::fmt::Write;
            let _ = write!(url, "&duration={duration}");
        }
        debug!(target: LOG_TARGET, "get request: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| provider_error(format!("get request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(provider_error(format!(
                "get returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| provider_error(format!("get response unreadable: {e}")))
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsResult, CoreError> {
        info!(
            target: LOG_TARGET,
            "fetching lyrics for {} - {} (duration: {:?}s)",
            query.artist, query.title, query.duration_secs
        );

        // Fuzzy search first: tolerant of remaster/feature suffixes the
        // exact endpoint would miss.
        match self.search(query).await {
            Ok(results) => {
                if let Some(best) = pick_best(results, query.duration_secs) {
                    let parsed = to_result(best);
                    if parsed.is_found() {
                        return Ok(parsed);
                    }
                }
                debug!(target: LOG_TARGET, "search had no usable candidate");
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "search failed, trying exact match: {e}");
            }
        }

        match self.get_exact(query).await? {
            Some(response) => {
                info!(target: LOG_TARGET, "exact match found (id: {})", response.id);
                Ok(to_result(response))
            }
            None => Ok(LyricsResult::NotFound),
        }
    }
}

/// Response from the LRCLIB API. Unknown fields are ignored by serde.
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl LrclibResponse {
    fn has_lyrics(&self) -> bool {
        !self.instrumental
            && (self.synced_lyrics.as_deref().is_some_and(|s| !s.trim().is_empty())
                || self.plain_lyrics.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Score for duration proximity (lower is better), capped to avoid overflow.
fn duration_score(actual: Option<f64>, expected: Option<u32>) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs();
            #[allow(clippy::cast_possible_truncation)]
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50,
    }
}

/// Choose the most promising candidate: synced beats plain, then closest
/// duration; candidates far outside the duration hint are rejected.
fn pick_best(results: Vec<LrclibResponse>, duration_hint: Option<u32>) -> Option<LrclibResponse> {
    results
        .into_iter()
        .filter(LrclibResponse::has_lyrics)
        .filter(|r| match (r.duration, duration_hint) {
            (Some(d), Some(q)) => (d - f64::from(q)).abs() <= DURATION_TOLERANCE_SECS,
            _ => true,
        })
        .min_by_key(|r| {
            let sync_score = if r.synced_lyrics.is_some() { 0 } else { 100 };
            sync_score + duration_score(r.duration, duration_hint)
        })
}

/// Convert a response into a lyric result, preferring the synced form.
fn to_result(response: LrclibResponse) -> LyricsResult {
    if response.instrumental {
        debug!(target: LOG_TARGET, "track is instrumental (id: {})", response.id);
        return LyricsResult::NotFound;
    }

    if let Some(synced) = response.synced_lyrics {
        if !synced.trim().is_empty() {
            match LyricSet::parse_synced(&synced, LyricSource::ThirdParty) {
                Ok(set) => {
                    debug!(
                        target: LOG_TARGET,
                        "got synced lyrics with {} lines (id: {})",
                        set.len(),
                        response.id
                    );
                    return LyricsResult::Synced(set);
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "failed to parse synced lyrics: {e}");
                }
            }
        }
    }

    if let Some(plain) = response.plain_lyrics {
        let set = LyricSet::from_plain(&plain, LyricSource::ThirdParty);
        if !set.is_empty() {
            debug!(target: LOG_TARGET, "got plain lyrics (id: {})", response.id);
            return LyricsResult::Unsynced(set);
        }
    }

    LyricsResult::NotFound
}

fn provider_error(reason: String) -> CoreError {
    CoreError::LyricsProviderFailed {
        provider: "lrclib".to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        id: i64,
        duration: Option<f64>,
        synced: Option<&str>,
        plain: Option<&str>,
    ) -> LrclibResponse {
        LrclibResponse {
            id,
            duration,
            instrumental: false,
            plain_lyrics: plain.map(ToString::to_string),
            synced_lyrics: synced.map(ToString::to_string),
        }
    }

    #[test]
    fn test_pick_best_prefers_synced() {
        let results = vec![
            candidate(1, Some(180.0), None, Some("plain text")),
            candidate(2, Some(180.0), Some("[00:01.00]line"), None),
        ];
        let best = pick_best(results, Some(180)).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_pick_best_uses_duration_proximity() {
        let results = vec![
            candidate(1, Some(240.0), Some("[00:01.00]a"), None),
            candidate(2, Some(181.0), Some("[00:01.00]b"), None),
        ];
        let best = pick_best(results, Some(180)).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_pick_best_rejects_out_of_tolerance() {
        let results = vec![candidate(1, Some(240.0), Some("[00:01.00]a"), None)];
        assert!(pick_best(results, Some(180)).is_none());
    }

    #[test]
    fn test_pick_best_skips_instrumental_and_empty() {
        let mut inst = candidate(1, Some(180.0), Some("[00:01.00]a"), None);
        inst.instrumental = true;
        let empty = candidate(2, Some(180.0), Some("   "), None);
        assert!(pick_best(vec![inst, empty], Some(180)).is_none());
    }

    #[test]
    fn test_to_result_synced() {
        let response = candidate(1, None, Some("[00:05.00]Hello\n[00:10.00]World"), None);
        match to_result(response) {
            LyricsResult::Synced(set) => {
                assert_eq!(set.len(), 2);
                assert!(set.synced);
                assert_eq!(set.source, LyricSource::ThirdParty);
            }
            other => panic!("expected synced, got {other:?}"),
        }
    }

    #[test]
    fn test_to_result_falls_back_to_plain() {
        let response = candidate(1, None, None, Some("Just words\nMore words"));
        match to_result(response) {
            LyricsResult::Unsynced(set) => assert_eq!(set.len(), 2),
            other => panic!("expected unsynced, got {other:?}"),
        }
    }

    #[test]
    fn test_to_result_instrumental_is_not_found() {
        let mut response = candidate(1, None, Some("[00:05.00]x"), None);
        response.instrumental = true;
        assert!(matches!(to_result(response), LyricsResult::NotFound));
    }

    #[test]
    fn test_unparsable_synced_falls_back_to_plain() {
        let response = candidate(1, None, Some("no tags here"), Some("Plain line"));
        assert!(matches!(to_result(response), LyricsResult::Unsynced(_)));
    }

    #[test]
    fn test_duration_score() {
        assert_eq!(duration_score(Some(180.0), Some(180)), 0);
        assert_eq!(duration_score(Some(183.5), Some(180)), 3);
        assert_eq!(duration_score(None, Some(180)), 50);
    }
}
