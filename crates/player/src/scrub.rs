use job_api::JobPhase;
use tracing::{debug, warn};

use crate::config::format_time;
use crate::media::MediaSurface;
use crate::state::PlaybackSnapshot;

/// Horizontal extent of the progress track, in the host's coordinates.
#[derive(Debug, Clone, Copy)]
pub struct TrackRect {
    pub left: f64,
    pub width: f64,
}

impl TrackRect {
    /// Fraction of the track under the given pointer x, clamped to [0, 1].
    ///
    /// Clamping also covers document-level drag moves that wander outside
    /// the track bounds.
    pub fn fraction_at(&self, x: f64) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        ((x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

/// Releases a document-level pointer grab exactly once.
///
/// Dropping the guard releases the grab, so every exit path out of a drag
/// (pointer-up, teardown, a new drag replacing a stuck one) unsubscribes
/// the global listeners without ad hoc flag checks.
pub struct CaptureGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl CaptureGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Guard that has nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Host hook for grabbing pointer input for the duration of a drag.
///
/// A browser host installs document-level move/up listeners here and
/// removes them when the guard drops; that is what keeps a release
/// outside the track bounds from being missed.
pub trait PointerHost: Send + Sync {
    fn begin_capture(&self) -> CaptureGuard;
}

/// Host without global pointer input; drags work but capture is a no-op.
#[derive(Debug, Default)]
pub struct NullPointerHost;

impl PointerHost for NullPointerHost {
    fn begin_capture(&self) -> CaptureGuard {
        CaptureGuard::noop()
    }
}

/// What a seek request turned into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    Applied { seconds: f64 },
    /// Preconditions not met (wrong phase or unknown duration); dropped
    /// silently, never surfaced to the user.
    Ignored,
}

struct DragSession {
    track: TrackRect,
    _capture: CaptureGuard,
}

/// Pointer interaction with the progress track.
///
/// Hover previews a position, a click seeks once, and press-drag-release
/// seeks continuously while the button is held. Dragging is a capability
/// flag so the basic page variant can run click-to-seek only. Visual
/// state (hover position, tooltip) is kept regardless of whether a seek
/// actually lands.
pub struct ScrubController {
    dragging_enabled: bool,
    hover_percent: Option<f64>,
    tooltip_visible: bool,
    drag: Option<DragSession>,
}

impl ScrubController {
    pub fn new(dragging_enabled: bool) -> Self {
        Self {
            dragging_enabled,
            hover_percent: None,
            tooltip_visible: false,
            drag: None,
        }
    }

    pub fn hover_percent(&self) -> Option<f64> {
        self.hover_percent
    }

    pub fn tooltip_visible(&self) -> bool {
        self.tooltip_visible
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Time label for the tooltip at the current hover position.
    pub fn tooltip_label(&self, snapshot: PlaybackSnapshot) -> Option<String> {
        let percent = self.hover_percent?;
        let duration = snapshot.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        Some(format_time(percent / 100.0 * duration))
    }

    /// Pointer entered the track: show the preview, no seek.
    pub fn pointer_enter(&mut self, x: f64, track: TrackRect) {
        self.hover_percent = Some(track.fraction_at(x) * 100.0);
        self.tooltip_visible = true;
    }

    /// Pointer moved over the track: update the preview, no seek.
    pub fn pointer_move(&mut self, x: f64, track: TrackRect) {
        self.hover_percent = Some(track.fraction_at(x) * 100.0);
        self.tooltip_visible = true;
    }

    /// Pointer left the track. Hover state dies here; an active drag does
    /// not, since its moves arrive through the document-level capture.
    pub fn pointer_leave(&mut self) {
        self.hover_percent = None;
        self.tooltip_visible = false;
    }

    /// Button pressed on the track: seek once and, when the capability is
    /// on, open a drag session holding the pointer grab.
    pub fn press(
        &mut self,
        x: f64,
        track: TrackRect,
        snapshot: PlaybackSnapshot,
        surface: &dyn MediaSurface,
        host: &dyn PointerHost,
    ) -> SeekOutcome {
        let outcome = self.seek_to_fraction(track.fraction_at(x), snapshot, surface);
        if self.dragging_enabled && snapshot.phase == JobPhase::Completed {
            // Replacing a stale session drops its guard first.
            self.drag = Some(DragSession {
                track,
                _capture: host.begin_capture(),
            });
        }
        outcome
    }

    /// Document-level move while the button is held: one seek per event.
    pub fn drag_move(
        &mut self,
        x: f64,
        snapshot: PlaybackSnapshot,
        surface: &dyn MediaSurface,
    ) -> SeekOutcome {
        let Some(session) = self.drag.as_ref() else {
            return SeekOutcome::Ignored;
        };
        let fraction = session.track.fraction_at(x);
        self.hover_percent = Some(fraction * 100.0);
        self.seek_to_fraction(fraction, snapshot, surface)
    }

    /// Button released anywhere: end the drag and release the grab.
    pub fn release(&mut self) {
        if self.drag.take().is_some() {
            debug!("drag session ended");
        }
    }

    /// Clamp, convert to media time, and seek.
    ///
    /// Pauses around the position write and resumes only if playback was
    /// active before, so a seek never starts a paused video. Without a
    /// completed asset or a known duration there is no timeline to seek
    /// on, and the request is dropped.
    fn seek_to_fraction(
        &self,
        fraction: f64,
        snapshot: PlaybackSnapshot,
        surface: &dyn MediaSurface,
    ) -> SeekOutcome {
        if snapshot.phase != JobPhase::Completed {
            debug!(phase = %snapshot.phase, "seek ignored outside completed phase");
            return SeekOutcome::Ignored;
        }
        let Some(duration) = snapshot.duration.filter(|d| d.is_finite() && *d > 0.0) else {
            debug!("seek ignored, duration unknown");
            return SeekOutcome::Ignored;
        };

        let seconds = fraction.clamp(0.0, 1.0) * duration;
        let resume = snapshot.is_playing;
        if let Err(err) = surface.pause() {
            warn!(%err, "pause before seek failed");
        }
        surface.set_position(seconds);
        if resume {
            if let Err(err) = surface.play() {
                warn!(%err, "resume after seek failed");
            }
        }
        SeekOutcome::Applied { seconds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicIsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Pause,
        SetPosition(f64),
        Play,
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingSurface {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn seeks(&self) -> Vec<f64> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::SetPosition(s) => Some(s),
                    _ => None,
                })
                .collect()
        }
    }

    impl MediaSurface for RecordingSurface {
        fn mount(&self, _url: &str) {}
        fn unmount(&self) {}
        fn reattach(&self) -> Result<()> {
            Ok(())
        }
        fn play(&self) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Play);
            Ok(())
        }
        fn pause(&self) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Pause);
            Ok(())
        }
        fn set_muted(&self, _muted: bool) {}
        fn position(&self) -> f64 {
            0.0
        }
        fn set_position(&self, seconds: f64) {
            self.calls.lock().unwrap().push(Call::SetPosition(seconds));
        }
        fn duration(&self) -> Option<f64> {
            Some(120.0)
        }
        fn set_fullscreen(&self, _enabled: bool) -> Result<()> {
            Ok(())
        }
    }

    /// Counts grabs currently held; goes negative on a double release.
    struct CountingHost {
        active: Arc<AtomicIsize>,
    }

    impl PointerHost for CountingHost {
        fn begin_capture(&self) -> CaptureGuard {
            self.active.fetch_add(1, Ordering::SeqCst);
            let active = self.active.clone();
            CaptureGuard::new(move || {
                active.fetch_sub(1, Ordering::SeqCst);
            })
        }
    }

    fn completed(duration: Option<f64>, playing: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: JobPhase::Completed,
            duration,
            is_playing: playing,
        }
    }

    fn track() -> TrackRect {
        TrackRect {
            left: 0.0,
            width: 1000.0,
        }
    }

    #[test]
    fn hover_previews_without_seeking() {
        let surface = RecordingSurface::default();
        let mut scrub = ScrubController::new(true);

        scrub.pointer_enter(250.0, track());
        scrub.pointer_move(500.0, track());
        assert_eq!(scrub.hover_percent(), Some(50.0));
        assert!(scrub.tooltip_visible());
        assert_eq!(
            scrub.tooltip_label(completed(Some(120.0), false)).as_deref(),
            Some("1:00")
        );
        assert!(surface.calls().is_empty());

        scrub.pointer_leave();
        assert_eq!(scrub.hover_percent(), None);
        assert!(!scrub.tooltip_visible());
    }

    #[test]
    fn click_seeks_once_and_resumes_only_if_playing() {
        let surface = RecordingSurface::default();
        let mut scrub = ScrubController::new(false);
        let host = NullPointerHost;

        let outcome = scrub.press(
            250.0,
            track(),
            completed(Some(120.0), true),
            &surface,
            &host,
        );
        assert_eq!(outcome, SeekOutcome::Applied { seconds: 30.0 });
        assert_eq!(
            surface.calls(),
            vec![Call::Pause, Call::SetPosition(30.0), Call::Play]
        );
        assert!(!scrub.is_dragging());

        // Paused video stays paused after the seek.
        let surface = RecordingSurface::default();
        scrub.press(
            250.0,
            track(),
            completed(Some(120.0), false),
            &surface,
            &host,
        );
        assert_eq!(surface.calls(), vec![Call::Pause, Call::SetPosition(30.0)]);
    }

    #[test]
    fn seek_is_noop_before_metadata_or_outside_completed() {
        let surface = RecordingSurface::default();
        let mut scrub = ScrubController::new(true);
        let host = NullPointerHost;

        let outcome = scrub.press(500.0, track(), completed(None, true), &surface, &host);
        assert_eq!(outcome, SeekOutcome::Ignored);

        let processing = PlaybackSnapshot {
            phase: JobPhase::Processing,
            duration: Some(120.0),
            is_playing: true,
        };
        let outcome = scrub.press(500.0, track(), processing, &surface, &host);
        assert_eq!(outcome, SeekOutcome::Ignored);

        let nan = completed(Some(f64::NAN), true);
        let outcome = scrub.press(500.0, track(), nan, &surface, &host);
        assert_eq!(outcome, SeekOutcome::Ignored);

        // Media position untouched in all three cases.
        assert!(surface.seeks().is_empty());
    }

    #[test]
    fn drag_from_ten_to_sixty_percent() {
        let surface = RecordingSurface::default();
        let active = Arc::new(AtomicIsize::new(0));
        let host = CountingHost {
            active: active.clone(),
        };
        let mut scrub = ScrubController::new(true);
        let snapshot = completed(Some(120.0), true);

        scrub.press(100.0, track(), snapshot, &surface, &host);
        assert!(scrub.is_dragging());
        assert_eq!(active.load(Ordering::SeqCst), 1);

        for x in [250.0, 400.0, 550.0, 600.0] {
            scrub.drag_move(x, snapshot, &surface);
        }
        scrub.release();

        // One seek per pointer event, landing at 60% of 120 s.
        assert_eq!(surface.seeks(), vec![12.0, 30.0, 48.0, 66.0, 72.0]);
        assert!(!scrub.is_dragging());
        assert_eq!(active.load(Ordering::SeqCst), 0);

        // A second release must not double-free the grab.
        scrub.release();
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drag_moves_clamp_outside_track_bounds() {
        let surface = RecordingSurface::default();
        let host = NullPointerHost;
        let mut scrub = ScrubController::new(true);
        let snapshot = completed(Some(120.0), false);

        scrub.press(500.0, track(), snapshot, &surface, &host);
        scrub.drag_move(-300.0, snapshot, &surface);
        scrub.drag_move(5000.0, snapshot, &surface);
        scrub.release();

        assert_eq!(surface.seeks(), vec![60.0, 0.0, 120.0]);
    }

    #[test]
    fn drag_disabled_means_no_session() {
        let surface = RecordingSurface::default();
        let active = Arc::new(AtomicIsize::new(0));
        let host = CountingHost {
            active: active.clone(),
        };
        let mut scrub = ScrubController::new(false);
        let snapshot = completed(Some(120.0), false);

        scrub.press(100.0, track(), snapshot, &surface, &host);
        assert!(!scrub.is_dragging());
        assert_eq!(active.load(Ordering::SeqCst), 0);
        assert_eq!(scrub.drag_move(600.0, snapshot, &surface), SeekOutcome::Ignored);
        assert_eq!(surface.seeks(), vec![12.0]);
    }
}
