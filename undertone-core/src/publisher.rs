//! Playback state publisher.
//!
//! Folds transport events and sequencer transitions into full
//! [`PlaybackState`] snapshots (never partial patches), fans them out to
//! local subscribers, and mirrors them to secondary render surfaces through
//! a [`SurfaceSink`] at a bounded rate.
//!
//! Rate contract: position-only updates cross the surface boundary at most
//! once per pacing window (~2/s), but any snapshot whose track id or
//! play/pause flag differs from the last one sent goes out immediately.
//! Snapshots redundant within
//! [`POSITION_TOLERANCE_SECS`](crate::playback::POSITION_TOLERANCE_SECS)
//! are suppressed entirely.

use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

use crate::playback::PlaybackState;
use crate::surface::{SurfaceMessage, SurfaceSink};
use crate::track::Track;
use crate::transport::TransportEvent;

const LOG_TARGET: &str = "undertone::publisher";

/// Minimum interval between position-driven surface broadcasts.
const SURFACE_PACING: Duration = Duration::from_millis(500);

struct PublisherInner {
    snapshot: PlaybackState,
    up_next: Vec<Track>,
    last_published: Option<PlaybackState>,
}

struct SurfaceGate {
    last_sent_at: Option<Instant>,
    last_track_id: Option<String>,
    last_is_playing: bool,
}

/// Aggregates playback state and distributes it.
pub struct StatePublisher {
    inner: RwLock<PublisherInner>,
    local_tx: broadcast::Sender<PlaybackState>,
    sink: Option<Box<dyn SurfaceSink>>,
    gate: Mutex<SurfaceGate>,
    pacing: Duration,
}

impl StatePublisher {
    /// Create a publisher; `sink` is the surface channel, absent when no
    /// secondary surface transport exists.
    #[must_use]
    pub fn new(sink: Option<Box<dyn SurfaceSink>>) -> Self {
        Self::with_pacing(sink, SURFACE_PACING)
    }

    /// Publisher with a custom pacing window.
    #[must_use]
    pub fn with_pacing(sink: Option<Box<dyn SurfaceSink>>, pacing: Duration) -> Self {
        let (local_tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(PublisherInner {
                snapshot: PlaybackState::new(),
                up_next: Vec::new(),
                last_published: None,
            }),
            local_tx,
            sink,
            gate: Mutex::new(SurfaceGate {
                last_sent_at: None,
                last_track_id: None,
                last_is_playing: false,
            }),
            pacing,
        }
    }

    /// Subscribe to snapshot emissions (same-process render surfaces).
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackState> {
        self.local_tx.subscribe()
    }

    /// Latest snapshot.
    pub async fn snapshot(&self) -> PlaybackState {
        self.inner.read().await.snapshot.clone()
    }

    /// Update the up-next preview shown to surfaces.
    pub async fn set_up_next(&self, up_next: Vec<Track>) {
        self.inner.write().await.up_next = up_next;
    }

    /// Fold a transport event into the snapshot and publish.
    pub async fn apply_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::PositionTick(secs) => {
                self.mutate(|s| {
                    s.position_secs = secs;
                    s.position_secs = s.clamped_position();
                })
                .await;
            }
            TransportEvent::LoadedMetadata(duration) => {
                self.mutate(|s| s.duration_secs = duration.max(0.0)).await;
            }
            TransportEvent::Play => self.mutate(|s| s.is_playing = true).await,
            TransportEvent::Pause => self.mutate(|s| s.is_playing = false).await,
            TransportEvent::Waiting => self.mutate(|s| s.is_loading = true).await,
            TransportEvent::CanPlay => self.mutate(|s| s.is_loading = false).await,
            TransportEvent::Error(message) => {
                self.mutate(|s| {
                    s.error = Some(message);
                    s.is_playing = false;
                    s.is_loading = false;
                })
                .await;
            }
            TransportEvent::Ended => {
                // End-of-track is a sequencing decision; the sequencer calls
                // mark_ended() when the end is terminal.
                debug!(target: LOG_TARGET, "ignoring raw Ended event");
            }
        }
    }

    /// A load was issued for `track`; reflect it eagerly.
    pub async fn begin_load(&self, track: &Track) {
        let track = track.clone();
        self.mutate(move |s| {
            s.duration_secs = track.duration_secs.max(0.0);
            s.current_track = Some(track);
            s.position_secs = 0.0;
            s.is_loading = true;
            s.is_playing = false;
            s.error = None;
        })
        .await;
    }

    /// A transport command failed; playback is stopped with the queue
    /// intact.
    pub async fn set_error(&self, message: String) {
        self.mutate(move |s| {
            s.error = Some(message);
            s.is_playing = false;
            s.is_loading = false;
        })
        .await;
    }

    /// Natural queue exhaustion: stopped at position zero, current track
    /// left visible.
    pub async fn mark_ended(&self) {
        self.mutate(|s| {
            s.is_playing = false;
            s.position_secs = 0.0;
        })
        .await;
    }

    /// Explicit stop: nothing loaded any more.
    pub async fn clear_current(&self) {
        self.mutate(|s| {
            s.current_track = None;
            s.is_playing = false;
            s.is_loading = false;
            s.position_secs = 0.0;
            s.duration_secs = 0.0;
        })
        .await;
    }

    pub async fn set_volume(&self, volume: f32) {
        self.mutate(move |s| s.volume = volume.clamp(0.0, 1.0)).await;
    }

    pub async fn toggle_mute(&self) {
        self.mutate(|s| s.is_muted = !s.is_muted).await;
    }

    /// Push the current snapshot to the surface channel immediately,
    /// bypassing pacing — used to answer `request-state`.
    pub async fn broadcast_now(&self) {
        let (snapshot, up_next) = {
            let inner = self.inner.read().await;
            (inner.snapshot.clone(), inner.up_next.clone())
        };
        self.send_to_surface(&snapshot, &up_next, true).await;
    }

    async fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut PlaybackState),
    {
        let (snapshot, up_next) = {
            let mut inner = self.inner.write().await;
            apply(&mut inner.snapshot);

            let redundant = inner
                .last_published
                .as_ref()
                .is_some_and(|last| last.is_redundant_with(&inner.snapshot));
            if redundant {
                return;
            }
            inner.last_published = Some(inner.snapshot.clone());
            (inner.snapshot.clone(), inner.up_next.clone())
        };

        // Local fan-out is synchronous; no receivers is fine.
        let _ = self.local_tx.send(snapshot.clone());

        self.send_to_surface(&snapshot, &up_next, false).await;
    }

    async fn send_to_surface(&self, snapshot: &PlaybackState, up_next: &[Track], force: bool) {
        let Some(sink) = &self.sink else { return };

        {
            let mut gate = self.gate.lock().await;
            let track_id = snapshot.current_track.as_ref().map(|t| t.id.clone());
            let identity_changed = gate.last_track_id != track_id
                || gate.last_is_playing != snapshot.is_playing;
            let due = gate
                .last_sent_at
                .map_or(true, |at| at.elapsed() >= self.pacing);

            if !(force || identity_changed || due) {
                return;
            }

            gate.last_sent_at = Some(Instant::now());
            gate.last_track_id = track_id;
            gate.last_is_playing = snapshot.is_playing;
        }

        let message = SurfaceMessage::from_snapshot(snapshot, up_next);
        if let Err(e) = sink.send(&message).await {
            // Best-effort: a missing or broken surface never disturbs
            // playback.
            warn!(target: LOG_TARGET, "surface broadcast failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::track::tests::make_track;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Default)]
    struct RecordingSink {
        messages: Arc<StdMutex<Vec<SurfaceMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl SurfaceSink for RecordingSink {
        async fn send(&self, message: &SurfaceMessage) -> Result<()> {
            if self.fail {
                return Err(CoreError::SurfaceBroadcastFailed {
                    reason: "no subscribers".to_string(),
                });
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn publisher_with_sink() -> (StatePublisher, Arc<StdMutex<Vec<SurfaceMessage>>>) {
        let messages = Arc::new(StdMutex::new(Vec::new()));
        let sink = RecordingSink {
            messages: messages.clone(),
            fail: false,
        };
        (StatePublisher::new(Some(Box::new(sink))), messages)
    }

    #[tokio::test]
    async fn test_local_subscribers_receive_snapshots() {
        let publisher = StatePublisher::new(None);
        let mut rx = publisher.subscribe();

        publisher.begin_load(&make_track("1")).await;
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.current_track.unwrap().id, "1");
        assert!(snapshot.is_loading);
        assert!(!snapshot.is_playing);
    }

    #[tokio::test]
    async fn test_redundant_ticks_suppressed() {
        let publisher = StatePublisher::new(None);
        publisher.begin_load(&make_track("1")).await;
        publisher
            .apply_transport_event(TransportEvent::PositionTick(10.0))
            .await;

        let mut rx = publisher.subscribe();
        publisher
            .apply_transport_event(TransportEvent::PositionTick(10.2))
            .await;
        // Within the 0.4s tolerance: nothing observable.
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        publisher
            .apply_transport_event(TransportEvent::PositionTick(10.5))
            .await;
        let snapshot = rx.recv().await.unwrap();
        assert!((snapshot.position_secs - 10.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_position_clamped_to_duration() {
        let publisher = StatePublisher::new(None);
        publisher.begin_load(&make_track("1")).await;
        publisher
            .apply_transport_event(TransportEvent::LoadedMetadata(100.0))
            .await;
        publisher
            .apply_transport_event(TransportEvent::PositionTick(150.0))
            .await;
        let snapshot = publisher.snapshot().await;
        assert!((snapshot.position_secs - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_surface_position_ticks_coalesced() {
        // Generous pacing window so the whole burst lands inside it even on
        // a slow test runner.
        let messages = Arc::new(StdMutex::new(Vec::new()));
        let publisher = StatePublisher::with_pacing(
            Some(Box::new(RecordingSink {
                messages: messages.clone(),
                fail: false,
            })),
            Duration::from_secs(60),
        );
        publisher.begin_load(&make_track("1")).await;
        publisher.apply_transport_event(TransportEvent::Play).await;
        let sent_before = messages.lock().unwrap().len();

        // Ten position ticks inside one pacing window, same track, still
        // playing: at most two more may cross the boundary.
        for i in 0..10 {
            publisher
                .apply_transport_event(TransportEvent::PositionTick(f64::from(i)))
                .await;
        }
        let sent_after = messages.lock().unwrap().len();
        assert!(
            sent_after - sent_before <= 2,
            "expected coalescing, got {} messages",
            sent_after - sent_before
        );
    }

    #[tokio::test]
    async fn test_track_change_broadcasts_immediately() {
        let (publisher, messages) = publisher_with_sink();
        publisher.begin_load(&make_track("1")).await;
        publisher.apply_transport_event(TransportEvent::Play).await;
        publisher
            .apply_transport_event(TransportEvent::PositionTick(1.0))
            .await;

        let before = messages.lock().unwrap().len();
        publisher.begin_load(&make_track("2")).await;
        let sent = messages.lock().unwrap();
        assert_eq!(sent.len(), before + 1, "track change must not be throttled");
        match sent.last().unwrap() {
            SurfaceMessage::AudioState { current_track, .. } => {
                assert_eq!(current_track.as_ref().unwrap().id, "2");
            }
            other => panic!("wrong message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_play_pause_flips_broadcast_immediately() {
        let (publisher, messages) = publisher_with_sink();
        publisher.begin_load(&make_track("1")).await;
        publisher.apply_transport_event(TransportEvent::Play).await;
        let before = messages.lock().unwrap().len();

        publisher.apply_transport_event(TransportEvent::Pause).await;
        assert_eq!(messages.lock().unwrap().len(), before + 1);
    }

    #[tokio::test]
    async fn test_broadcast_now_bypasses_pacing() {
        let (publisher, messages) = publisher_with_sink();
        publisher.begin_load(&make_track("1")).await;
        let before = messages.lock().unwrap().len();

        publisher.broadcast_now().await;
        publisher.broadcast_now().await;
        assert_eq!(messages.lock().unwrap().len(), before + 2);
    }

    #[tokio::test]
    async fn test_sink_failure_absorbed() {
        let publisher = StatePublisher::new(Some(Box::new(RecordingSink {
            messages: Arc::new(StdMutex::new(Vec::new())),
            fail: true,
        })));
        // Must not panic or propagate.
        publisher.begin_load(&make_track("1")).await;
        publisher.broadcast_now().await;
    }

    #[tokio::test]
    async fn test_error_event_stops_playback() {
        let publisher = StatePublisher::new(None);
        publisher.begin_load(&make_track("1")).await;
        publisher.apply_transport_event(TransportEvent::Play).await;
        publisher
            .apply_transport_event(TransportEvent::Error("decode failed".to_string()))
            .await;

        let snapshot = publisher.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some("decode failed"));
        assert!(!snapshot.is_playing);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_up_next_travels_with_state() {
        let (publisher, messages) = publisher_with_sink();
        publisher
            .set_up_next(vec![make_track("2"), make_track("3")])
            .await;
        publisher.begin_load(&make_track("1")).await;

        let sent = messages.lock().unwrap();
        match sent.last().unwrap() {
            SurfaceMessage::AudioState { up_next, .. } => {
                assert_eq!(up_next.len(), 2);
                assert_eq!(up_next[0].id, "2");
            }
            other => panic!("wrong message: {other:?}"),
        }
    }
}
