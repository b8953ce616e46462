use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Core configuration, deserialized from TOML by the embedding client.
///
/// Everything has a sensible default; an empty document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Provider priority after the server's own lyrics; tried in order.
    #[serde(default = "default_providers")]
    pub providers: Vec<LyricsProviderType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Upper bound on session history length.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsProviderType {
    Lrclib,
}

fn default_providers() -> Vec<LyricsProviderType> {
    vec![LyricsProviderType::Lrclib]
}

const fn default_history_limit() -> usize {
    500
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl CoreConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::ConfigParseError`] on malformed
    /// input.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }
}

/// Commented template for a fresh config file.
#[must_use]
pub fn build_config_template() -> String {
    r#"# undertone core configuration

[lyrics]
# Third-party providers tried after the server's own lyrics, in order.
providers = ["lrclib"]

[playback]
# How many played tracks the session history keeps for "previous".
history_limit = 500
"#
    .to_string()
}
