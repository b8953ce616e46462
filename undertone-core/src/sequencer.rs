//! Playback sequencer: owns the queue, the session history, and the
//! shuffle/repeat state machine, and decides what plays next.
//!
//! All intents and transport events must be delivered through one
//! serialization point — the sequencer is `&mut self` and is not safe for
//! concurrent external mutation. Queue/history bookkeeping happens eagerly,
//! before any transport await, so the visible "what's next" state is
//! consistent even while a load is still in flight or ultimately fails.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::playback::{RepeatMode, ShuffleRepeatConfig};
use crate::publisher::StatePublisher;
use crate::queue::{History, PlayQueue};
use crate::surface::{SurfaceAction, SurfaceMessage, UP_NEXT_PREVIEW_LEN};
use crate::track::Track;
use crate::transport::{StreamUrlSource, Transport, TransportEvent};

const LOG_TARGET: &str = "undertone::sequencer";

/// Positions at or past this many seconds make Previous() restart the
/// current track instead of walking history back. A design constant, not
/// negotiable by callers.
const PREVIOUS_RESTART_THRESHOLD_SECS: f64 = 3.0;

/// Owns playback sequencing for one client session.
pub struct Sequencer {
    transport: Box<dyn Transport>,
    streams: Box<dyn StreamUrlSource>,
    publisher: Arc<StatePublisher>,
    queue: PlayQueue,
    history: History,
    config: ShuffleRepeatConfig,
    /// Mirror of the track most recently handed to the transport.
    current: Option<Track>,
}

impl Sequencer {
    #[must_use]
    pub fn new(
        transport: Box<dyn Transport>,
        streams: Box<dyn StreamUrlSource>,
        publisher: Arc<StatePublisher>,
    ) -> Self {
        Self {
            transport,
            streams,
            publisher,
            queue: PlayQueue::new(),
            history: History::default(),
            config: ShuffleRepeatConfig::default(),
            current: None,
        }
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::new(limit);
        self
    }

    /// Sequencer with limits taken from a parsed [`CoreConfig`].
    #[must_use]
    pub fn from_config(
        transport: Box<dyn Transport>,
        streams: Box<dyn StreamUrlSource>,
        publisher: Arc<StatePublisher>,
        config: &crate::config::CoreConfig,
    ) -> Self {
        Self::new(transport, streams, publisher)
            .with_history_limit(config.playback.history_limit)
    }

    /// Play `track` now.
    ///
    /// With a context list (album, playlist, search results), everything
    /// after the track's position becomes the new queue and history starts
    /// over at this track. Without one, the existing queue stays intact and
    /// the track is recorded as the next history entry.
    pub async fn play_track(&mut self, track: Track, context: Option<&[Track]>) {
        match context {
            Some(list) if !list.is_empty() => {
                let upcoming = match list.iter().position(|t| t.id == track.id) {
                    Some(pos) => list[pos + 1..].to_vec(),
                    None => list.to_vec(),
                };
                self.queue.replace(upcoming);
                self.history.reset_to(track.clone());
            }
            _ => {
                self.history.record(track.clone());
            }
        }
        self.load_and_play(track).await;
    }

    /// Manual skip. On an exhausted queue this is a no-op unless repeat-all
    /// can wrap.
    pub async fn next(&mut self) {
        match self.select_next() {
            Some(track) => {
                info!(target: LOG_TARGET, "skipping to {} - {}", track.artist, track.title);
                self.load_and_play(track).await;
            }
            None => {
                debug!(target: LOG_TARGET, "next ignored: queue exhausted");
            }
        }
    }

    /// Restart the current track when meaningfully into it, otherwise walk
    /// one step back through history. Never touches the queue.
    pub async fn previous(&mut self) {
        let position = self.publisher.snapshot().await.position_secs;
        let at_history_start = self.history.cursor().unwrap_or(0) == 0;

        if position >= PREVIOUS_RESTART_THRESHOLD_SECS || at_history_start {
            if self.current.is_some() {
                self.transport.seek(0.0).await;
            }
            return;
        }

        if let Some(track) = self.history.step_back().cloned() {
            info!(target: LOG_TARGET, "replaying {} - {}", track.artist, track.title);
            self.load_and_play(track).await;
        }
    }

    /// Natural end-of-stream. Unlike a manual skip, running out of queue
    /// here is a terminal state: playback stops at position zero.
    pub async fn on_track_ended(&mut self) {
        if self.config.repeat == RepeatMode::One {
            if let Some(track) = self.current.clone() {
                debug!(target: LOG_TARGET, "repeat-one: reloading {}", track.id);
                self.load_and_play(track).await;
                return;
            }
        }

        match self.select_next() {
            Some(track) => self.load_and_play(track).await,
            None => {
                info!(target: LOG_TARGET, "queue exhausted, stopping");
                self.publisher.mark_ended().await;
            }
        }
    }

    /// Route a transport event. End-of-stream feeds the sequencing state
    /// machine; everything else folds straight into the published state.
    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Ended => self.on_track_ended().await,
            other => self.publisher.apply_transport_event(other).await,
        }
    }

    /// Handle a message arriving from a secondary render surface.
    pub async fn handle_surface_message(&mut self, message: SurfaceMessage) {
        match message {
            SurfaceMessage::Command { action, payload } => {
                self.handle_surface_command(action, payload).await;
            }
            SurfaceMessage::RequestState => self.publisher.broadcast_now().await,
            // State snapshots only flow outward.
            SurfaceMessage::AudioState { .. } => {}
        }
    }

    pub async fn handle_surface_command(&mut self, action: SurfaceAction, payload: Option<f64>) {
        match action {
            SurfaceAction::Play => self.resume().await,
            SurfaceAction::Pause => self.pause().await,
            SurfaceAction::Toggle => self.toggle_play().await,
            SurfaceAction::Next => self.next().await,
            SurfaceAction::Previous => self.previous().await,
            SurfaceAction::Seek => {
                if let Some(position) = payload {
                    self.seek(position).await;
                }
            }
        }
    }

    pub async fn pause(&mut self) {
        self.transport.pause().await;
    }

    pub async fn resume(&mut self) {
        if self.current.is_none() {
            return;
        }
        if let Err(e) = self.transport.play().await {
            self.publisher.set_error(e.to_string()).await;
        }
    }

    pub async fn toggle_play(&mut self) {
        if self.publisher.snapshot().await.is_playing {
            self.pause().await;
        } else {
            self.resume().await;
        }
    }

    /// Stop playback and unload the current track; queue and history stay.
    pub async fn stop(&mut self) {
        self.transport.stop().await;
        self.current = None;
        self.publisher.clear_current().await;
    }

    pub async fn seek(&mut self, position_secs: f64) {
        self.transport.seek(position_secs.max(0.0)).await;
    }

    /// Seek to a percentage of the current track's duration.
    pub async fn seek_percent(&mut self, percent: f64) {
        let duration = self.publisher.snapshot().await.duration_secs;
        if duration > 0.0 {
            self.seek(duration * (percent.clamp(0.0, 100.0) / 100.0)).await;
        }
    }

    pub async fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.transport.set_volume(volume).await;
        self.publisher.set_volume(volume).await;
    }

    pub async fn toggle_mute(&mut self) {
        self.transport.toggle_mute().await;
        self.publisher.toggle_mute().await;
    }

    /// Affects only future selection; the queue is not reordered.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.config.shuffled = !self.config.shuffled;
        info!(target: LOG_TARGET, "shuffle {}", if self.config.shuffled { "on" } else { "off" });
        self.config.shuffled
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.config.repeat = self.config.repeat.cycle();
        info!(target: LOG_TARGET, "repeat mode {:?}", self.config.repeat);
        self.config.repeat
    }

    #[must_use]
    pub fn shuffle_repeat(&self) -> ShuffleRepeatConfig {
        self.config
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Pick the next track and record it in history.
    ///
    /// On an empty queue with repeat-all, the queue is refilled from the
    /// history remainder (history rewinds to its first entry) and selection
    /// resumes from the top of the restored queue.
    fn select_next(&mut self) -> Option<Track> {
        if self.queue.is_empty() {
            if self.config.repeat != RepeatMode::All {
                return None;
            }
            let rest = self.history.rewind_for_wrap()?;
            info!(target: LOG_TARGET, "repeat-all wrap: requeueing {} tracks", rest.len());
            self.queue.replace(rest);
        }

        let index = self.pick_index();
        let track = self.queue.take_at(index)?;
        self.history.record(track.clone());
        Some(track)
    }

    /// Index 0 in order mode; a uniformly random index in shuffle mode.
    /// The candidate set excludes the currently playing track so a wrap
    /// refill can never replay the track that just finished.
    fn pick_index(&self) -> usize {
        if !self.config.shuffled || self.queue.len() < 2 {
            return 0;
        }

        let current_id = self.current.as_ref().map(|t| t.id.as_str());
        let candidates: Vec<usize> = self
            .queue
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, t)| Some(t.id.as_str()) != current_id)
            .map(|(i, _)| i)
            .collect();

        candidates
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(0)
    }

    async fn load_and_play(&mut self, track: Track) {
        self.current = Some(track.clone());
        self.publisher.begin_load(&track).await;
        self.publisher
            .set_up_next(self.queue.preview(UP_NEXT_PREVIEW_LEN))
            .await;

        let url = self.streams.stream_url(&track);
        let result = match self.transport.load(&track, &url).await {
            Ok(()) => self.transport.play().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            // Bookkeeping stays as "what we intended to play"; the UI may
            // retry via play_track or next.
            warn!(target: LOG_TARGET, "failed to start {}: {e}", track.id);
            self.publisher.set_error(e.to_string()).await;
        }
    }
}
