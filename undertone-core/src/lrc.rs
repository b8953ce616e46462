//! Time-tagged lyric parsing and the lyric data model.
//!
//! Accepts LRC-style input: bracketed `mm:ss[.xx]` markers, multiple markers
//! per line (the line repeats at each time), and metadata tags such as
//! `[ti:..]`/`[ar:..]`/`[offset:..]`. Metadata lines are discarded from the
//! output; an offset tag is still applied to line timing.

use crate::error::{CoreError, Result};
use std::time::Duration;

/// Where a lyric set was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricSource {
    /// The music server's own lyric endpoint.
    Server,
    /// A third-party provider.
    ThirdParty,
}

/// A single lyric line. `time` is meaningful only when the owning set is
/// synced; unsynced sets are distributed over the track duration by the
/// cursor instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time: Duration,
    pub text: String,
}

/// An ordered set of lyric lines, sorted ascending by time when synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricSet {
    pub lines: Vec<LyricLine>,
    pub synced: bool,
    pub source: LyricSource,
}

impl LyricSet {
    /// Parse time-tagged input into a synced set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LrcParseError`] when no timed line could be
    /// extracted at all.
    pub fn parse_synced(input: &str, source: LyricSource) -> Result<Self> {
        let mut offset_ms: i64 = 0;
        let mut lines = Vec::new();

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((tag, value)) = parse_id_tag(line) {
                if tag.eq_ignore_ascii_case("offset") {
                    if let Ok(parsed) = value.parse::<i64>() {
                        offset_ms = parsed;
                    }
                }
                // Other metadata tags (artist/title/album/length/author)
                // carry no display content.
                continue;
            }

            if let Some(parsed) = parse_timed_line(line) {
                lines.extend(parsed);
            }
        }

        if lines.is_empty() {
            return Err(CoreError::LrcParseError {
                reason: "no timed lines found".to_string(),
            });
        }

        if offset_ms != 0 {
            for line in &mut lines {
                line.time = apply_offset(line.time, offset_ms);
            }
        }

        lines.sort_by_key(|l| l.time);

        Ok(Self {
            lines,
            synced: true,
            source,
        })
    }

    /// Wrap plain text as an unsynced set, one line per non-empty text line.
    #[must_use]
    pub fn from_plain(text: &str, source: LyricSource) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| LyricLine {
                time: Duration::ZERO,
                text: l.to_string(),
            })
            .collect();

        Self {
            lines,
            synced: false,
            source,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Lines around `active` for display: `before` lines of context above,
    /// `after` below. With no active line, the window starts at the top.
    #[must_use]
    pub fn visible_window(&self, active: Option<usize>, before: usize, after: usize) -> &[LyricLine] {
        if self.lines.is_empty() {
            return &[];
        }
        let active = active.unwrap_or(0).min(self.lines.len() - 1);
        let start = active.saturating_sub(before);
        let end = (active + after + 1).min(self.lines.len());
        &self.lines[start..end]
    }
}

/// Whether raw text carries recognizable time tags.
#[must_use]
pub fn has_time_tags(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('[')
            && line
                .find(']')
                .and_then(|end| parse_timestamp(&line[1..end]))
                .is_some()
    })
}

/// Parse a metadata tag like `[ti:Title]`. Returns `None` for timestamps.
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('[') {
        return None;
    }
    let end = line.find(']')?;
    let content = &line[1..end];
    let colon = content.find(':')?;
    let tag = &content[..colon];

    // A leading all-digit tag is a timestamp, not metadata.
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((tag, content[colon + 1..].trim()))
}

/// Parse `[mm:ss.xx]Text` or `[mm:ss.xx][mm:ss.xx]Text`, emitting one line
/// per leading marker.
fn parse_timed_line(line: &str) -> Option<Vec<LyricLine>> {
    let mut times = Vec::new();
    let mut rest = line;

    while rest.starts_with('[') {
        let Some(end) = rest.find(']') else { break };
        let Some(time) = parse_timestamp(&rest[1..end]) else {
            break;
        };
        times.push(time);
        rest = &rest[end + 1..];
    }

    if times.is_empty() {
        return None;
    }

    let text = rest.trim();
    Some(
        times
            .into_iter()
            .map(|time| LyricLine {
                time,
                text: text.to_string(),
            })
            .collect(),
    )
}

/// Parse `mm:ss`, `mm:ss.xx`, or `mm:ss:xx` (hundredths) into a duration.
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.len() {
        2 => {
            let minutes: u64 = parts[0].parse().ok()?;
            let seconds: f64 = parts[1].parse().ok()?;
            if !(0.0..60.0).contains(&seconds) {
                return None;
            }
            Some(Duration::from_secs_f64(f64_from_u64(minutes) * 60.0 + seconds))
        }
        3 => {
            let minutes: u64 = parts[0].parse().ok()?;
            let seconds: u64 = parts[1].parse().ok()?;
            let hundredths: u64 = parts[2].parse().ok()?;
            Some(Duration::from_millis(
                minutes * 60 * 1000 + seconds * 1000 + hundredths * 10,
            ))
        }
        _ => None,
    }
}

// Minute counts in lyric timestamps are tiny; the cast cannot lose precision
// in practice but the lint has no way to know that.
#[allow(clippy::cast_precision_loss)]
fn f64_from_u64(v: u64) -> f64 {
    v as f64
}

fn apply_offset(time: Duration, offset_ms: i64) -> Duration {
    if offset_ms >= 0 {
        time + Duration::from_millis(offset_ms.unsigned_abs())
    } else {
        time.saturating_sub(Duration::from_millis(offset_ms.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let set = LyricSet::parse_synced("[00:12.34]Hello world", LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines.len(), 1);
        assert_eq!(set.lines[0].time, Duration::from_millis(12340));
        assert_eq!(set.lines[0].text, "Hello world");
        assert!(set.synced);
    }

    #[test]
    fn test_metadata_tags_discarded() {
        let input = "[ti:Song]\n[ar:Artist]\n[al:Album]\n[length:03:20]\n[00:05.00]Lyrics here";
        let set = LyricSet::parse_synced(input, LyricSource::Server).unwrap();
        assert_eq!(set.lines.len(), 1);
        assert_eq!(set.lines[0].text, "Lyrics here");
    }

    #[test]
    fn test_multi_timestamp_line_repeats_text() {
        let set =
            LyricSet::parse_synced("[00:05.00][00:15.00]Chorus", LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines.len(), 2);
        assert_eq!(set.lines[0].time, Duration::from_secs(5));
        assert_eq!(set.lines[1].time, Duration::from_secs(15));
        assert_eq!(set.lines[0].text, set.lines[1].text);
    }

    #[test]
    fn test_lines_sorted_ascending() {
        let input = "[00:20.00]Second\n[00:10.00]First";
        let set = LyricSet::parse_synced(input, LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines[0].text, "First");
        assert_eq!(set.lines[1].text, "Second");
    }

    #[test]
    fn test_offset_applied() {
        let input = "[offset:500]\n[00:10.00]Test";
        let set = LyricSet::parse_synced(input, LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines[0].time, Duration::from_millis(10500));

        let input = "[offset:-500]\n[00:10.00]Test";
        let set = LyricSet::parse_synced(input, LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines[0].time, Duration::from_millis(9500));
    }

    #[test]
    fn test_colon_hundredths_format() {
        let set = LyricSet::parse_synced("[00:12:34]Hello", LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines[0].time, Duration::from_millis(12340));
    }

    #[test]
    fn test_no_timed_lines_is_error() {
        assert!(LyricSet::parse_synced("just plain text", LyricSource::Server).is_err());
        assert!(LyricSet::parse_synced("[ti:Only metadata]", LyricSource::Server).is_err());
    }

    #[test]
    fn test_from_plain_skips_blank_lines() {
        let set = LyricSet::from_plain("First\n\n  \nSecond\n", LyricSource::Server);
        assert_eq!(set.lines.len(), 2);
        assert!(!set.synced);
        assert_eq!(set.lines[1].text, "Second");
    }

    #[test]
    fn test_has_time_tags() {
        assert!(has_time_tags("[00:12.34]Hello"));
        assert!(has_time_tags("some preamble\n[01:02]Line"));
        assert!(!has_time_tags("[ti:Title]\nplain line"));
        assert!(!has_time_tags("no tags at all"));
    }

    #[test]
    fn test_visible_window() {
        let input = "[00:05.00]L1\n[00:10.00]L2\n[00:15.00]L3\n[00:20.00]L4\n[00:25.00]L5";
        let set = LyricSet::parse_synced(input, LyricSource::ThirdParty).unwrap();

        let window = set.visible_window(Some(1), 1, 1);
        let texts: Vec<&str> = window.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["L1", "L2", "L3"]);

        // Window clamps at both ends.
        let window = set.visible_window(Some(4), 1, 3);
        assert_eq!(window.len(), 2);
        let window = set.visible_window(None, 2, 1);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_cjk_text_preserved() {
        let set = LyricSet::parse_synced("[00:05.00]你好世界", LyricSource::ThirdParty).unwrap();
        assert_eq!(set.lines[0].text, "你好世界");
    }
}
