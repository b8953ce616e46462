use serde::{Deserialize, Serialize};

/// A track as described by the music server.
///
/// Identity is the server-scoped `id`; every other field is descriptive.
/// Instances are produced by the REST layer and treated as read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    pub album: String,
    #[serde(default)]
    pub album_id: Option<String>,
    /// Track duration in seconds, as reported by the server.
    pub duration_secs: f64,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    /// Cover art reference, resolvable through the server's art endpoint.
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub liked: bool,
}

impl Track {
    /// Check whether two tracks refer to the same server entity.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}
