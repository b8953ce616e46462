//! Play queue and session history, owned exclusively by the sequencer.

use crate::track::Track;

/// Upcoming tracks. Consumed destructively by next-track selection.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
}

impl PlayQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    /// Remove and return the track at `index`.
    pub fn take_at(&mut self, index: usize) -> Option<Track> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }

    /// Remove and return the head of the queue.
    pub fn take_first(&mut self) -> Option<Track> {
        self.take_at(0)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// First `limit` upcoming tracks, for display previews.
    #[must_use]
    pub fn preview(&self, limit: usize) -> Vec<Track> {
        self.tracks.iter().take(limit).cloned().collect()
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Tracks already played this session, with a cursor at the entry that is
/// currently loaded.
///
/// Invariant: after every sequencer transition, `current()` equals the track
/// most recently handed to the transport. Walking back replays history only;
/// it never returns tracks to the queue.
#[derive(Debug, Clone)]
pub struct History {
    tracks: Vec<Track>,
    cursor: Option<usize>,
    max_len: usize,
}

impl History {
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            tracks: Vec::new(),
            cursor: None,
            max_len: max_len.max(1),
        }
    }

    /// Drop everything and start over with `track` as the sole entry.
    pub fn reset_to(&mut self, track: Track) {
        self.tracks.clear();
        self.tracks.push(track);
        self.cursor = Some(0);
    }

    /// Record `track` as the new current entry.
    ///
    /// Entries ahead of the cursor are discarded first: a new transition
    /// invalidates stale redo entries. Oldest entries fall off when the
    /// bound is reached.
    pub fn record(&mut self, track: Track) {
        if let Some(cursor) = self.cursor {
            self.tracks.truncate(cursor + 1);
        } else {
            self.tracks.clear();
        }
        self.tracks.push(track);
        if self.tracks.len() > self.max_len {
            let excess = self.tracks.len() - self.max_len;
            self.tracks.drain(..excess);
        }
        self.cursor = Some(self.tracks.len() - 1);
    }

    /// The entry under the cursor, when one exists.
    #[must_use]
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    /// Move the cursor one entry back and return the track now under it.
    pub fn step_back(&mut self) -> Option<&Track> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        self.tracks.get(cursor - 1)
    }

    /// Rewind for a repeat-all wrap: keep only the first entry (cursor on
    /// it) and return the remainder, oldest first, for refilling the queue.
    ///
    /// Returns `None` when there is nothing to wrap onto (one entry or
    /// fewer).
    pub fn rewind_for_wrap(&mut self) -> Option<Vec<Track>> {
        if self.tracks.len() < 2 {
            return None;
        }
        let rest = self.tracks.split_off(1);
        self.cursor = Some(0);
        Some(rest)
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(500)
    }
}
