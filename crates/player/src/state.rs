use job_api::{JobId, JobPhase, StatusReport};
use serde::Serialize;
use tracing::{debug, info};

use crate::media::MediaSignal;
use crate::probe::ProbeOutcome;

/// Everything that can change the playback state.
///
/// Poller, probe, and media-element notifications are tagged with the job
/// they were issued for; a tag that no longer matches the tracked job is
/// discarded, which is the only guard against late responses from a
/// superseded job.
#[derive(Debug)]
pub enum PlayerEvent {
    /// Status report from the poller.
    Status { job: JobId, report: StatusReport },

    /// The poller hit a transport failure and stopped.
    PollFailed { job: JobId, message: String },

    /// Notification from the media element.
    Media { job: JobId, signal: MediaSignal },

    /// Result of the side probe after a media load error.
    Probe { job: JobId, outcome: ProbeOutcome },

    /// The forced-reload delay elapsed.
    ReattachDue { job: JobId },

    /// Simulated-progress clock tick.
    Tick,

    /// Direct user action.
    Intent(Intent),
}

/// User actions, independent of job phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    TogglePlay,
    ToggleMute,
    /// Jump back to the start and play.
    Reset,
    ToggleFullscreen,
    /// Fullscreen state changed outside the player (e.g. the host's own
    /// escape handling); sync the flag without issuing a new request.
    FullscreenChanged(bool),
    SetDragging(bool),
}

/// Commands the state machine asks its driver to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    MountMedia { url: String },
    UnmountMedia,
    /// Run the media probe to classify a load error.
    RunProbe,
    /// Start the forced-reload timer.
    ScheduleReattach,
    /// Clear and restore the media source now.
    ReattachMedia,
    Play,
    Pause,
    SetMuted(bool),
    SeekToStart,
    SetFullscreen(bool),
}

/// UI-facing projection of the player state.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackView {
    pub phase: JobPhase,
    pub message: String,
    pub media_ref: Option<String>,

    /// Placeholder progress shown while the job renders, 0–100.
    pub simulated_progress: f64,

    /// Real playback progress once the asset plays, 0–100.
    pub real_progress: f64,

    /// Media duration in seconds, cached from metadata load.
    pub duration: Option<f64>,

    pub is_playing: bool,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    pub is_dragging: bool,
}

impl PlaybackView {
    fn reset(phase: JobPhase, message: String) -> Self {
        Self {
            phase,
            message,
            media_ref: None,
            simulated_progress: 0.0,
            real_progress: 0.0,
            duration: None,
            is_playing: false,
            is_muted: false,
            is_fullscreen: false,
            is_dragging: false,
        }
    }

    /// The progress value that is live for the current phase.
    pub fn active_progress(&self) -> f64 {
        if self.phase == JobPhase::Completed {
            self.real_progress
        } else {
            self.simulated_progress
        }
    }
}

/// Read-only state the scrub controller needs for seek preconditions.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSnapshot {
    pub phase: JobPhase,
    pub duration: Option<f64>,
    pub is_playing: bool,
}

fn phase_rank(phase: JobPhase) -> u8 {
    match phase {
        JobPhase::Loading => 0,
        JobPhase::Processing => 1,
        JobPhase::Completed => 2,
        JobPhase::Failed => 3,
    }
}

/// Single source of truth for the playback phase and progress.
///
/// All writes go through [`apply`](Self::apply); poller, probe, media
/// callbacks, the tick clock, and user intents never touch the view
/// directly, so two sources can never disagree about it.
pub struct PlaybackStateMachine {
    job: Option<JobId>,
    media_url: Option<String>,
    view: PlaybackView,
    captions: Vec<String>,
    tick_step: f64,
}

impl PlaybackStateMachine {
    pub fn new(captions: Vec<String>, tick_step: f64) -> Self {
        Self {
            job: None,
            media_url: None,
            view: PlaybackView::reset(JobPhase::Loading, "Checking video status...".into()),
            captions,
            tick_step,
        }
    }

    /// Start tracking a job, discarding every trace of the previous one.
    ///
    /// This is the only place progress values reset to zero.
    pub fn begin(&mut self, job: JobId, media_url: String) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.view.phase == JobPhase::Completed {
            effects.push(Effect::UnmountMedia);
        }
        info!(job = %job, "tracking job");
        self.job = Some(job);
        self.media_url = Some(media_url);
        self.view = PlaybackView::reset(JobPhase::Loading, "Checking video status...".into());
        effects
    }

    pub fn view(&self) -> &PlaybackView {
        &self.view
    }

    pub fn phase(&self) -> JobPhase {
        self.view.phase
    }

    pub fn job(&self) -> Option<&JobId> {
        self.job.as_ref()
    }

    /// Playback controls are interactive only once the asset is playable.
    pub fn controls_enabled(&self) -> bool {
        self.view.phase == JobPhase::Completed
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.view.phase,
            duration: self.view.duration,
            is_playing: self.view.is_playing,
        }
    }

    /// Caption for the current simulated progress, while processing.
    pub fn current_caption(&self) -> Option<&str> {
        if self.view.phase != JobPhase::Processing || self.captions.is_empty() {
            return None;
        }
        let index =
            (self.view.simulated_progress / 100.0 * self.captions.len() as f64).floor() as usize;
        self.captions.get(index).map(String::as_str)
    }

    fn is_current(&self, job: &JobId) -> bool {
        self.job.as_ref() == Some(job)
    }

    /// Apply one event and return the effects it demands.
    pub fn apply(&mut self, event: PlayerEvent) -> Vec<Effect> {
        match event {
            PlayerEvent::Status { job, report } => {
                if !self.is_current(&job) {
                    debug!(stale = %job, "discarding status for superseded job");
                    return Vec::new();
                }
                self.ingest_report(report)
            }
            PlayerEvent::PollFailed { job, message } => {
                if !self.is_current(&job) {
                    return Vec::new();
                }
                // Once the asset is live the poll result is moot; only the
                // probe's genuine-failure path may demote a completed player.
                if self.view.phase == JobPhase::Completed {
                    return Vec::new();
                }
                self.fail(message)
            }
            PlayerEvent::Media { job, signal } => {
                if !self.is_current(&job) {
                    debug!(stale = %job, "discarding media signal for superseded job");
                    return Vec::new();
                }
                self.on_media(signal)
            }
            PlayerEvent::Probe { job, outcome } => {
                if !self.is_current(&job) {
                    debug!(stale = %job, "discarding probe result for superseded job");
                    return Vec::new();
                }
                self.on_probe(outcome)
            }
            PlayerEvent::ReattachDue { job } => {
                // The timer belongs to the processing phase; a transition
                // away in the meantime voids it.
                if !self.is_current(&job) || self.view.phase != JobPhase::Processing {
                    return Vec::new();
                }
                vec![Effect::ReattachMedia]
            }
            PlayerEvent::Tick => {
                self.on_tick();
                Vec::new()
            }
            PlayerEvent::Intent(intent) => self.on_intent(intent),
        }
    }

    /// Fold a status report into the phase lattice.
    ///
    /// Terminal states never revert; `Failed` is reachable from any
    /// non-terminal state; anything else must move forward.
    fn ingest_report(&mut self, report: StatusReport) -> Vec<Effect> {
        let current = self.view.phase;
        if current.is_terminal() {
            debug!(%current, incoming = %report.status, "ignoring report in terminal phase");
            return Vec::new();
        }

        let next = report.status;
        if next != JobPhase::Failed && phase_rank(next) < phase_rank(current) {
            debug!(%current, incoming = %next, "ignoring backward phase report");
            return Vec::new();
        }

        if next != current {
            info!(job = ?self.job, from = %current, to = %next, "phase transition");
        }
        self.view.phase = next;
        self.view.message = report.message;
        if report.media_ref.is_some() {
            self.view.media_ref = report.media_ref;
        }

        match next {
            JobPhase::Completed if current != JobPhase::Completed => {
                match self.media_url.clone() {
                    Some(url) => vec![Effect::MountMedia { url }],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Terminal failure, the one path that may leave `Completed`.
    fn fail(&mut self, message: String) -> Vec<Effect> {
        if self.view.phase == JobPhase::Failed {
            return Vec::new();
        }
        let was_completed = self.view.phase == JobPhase::Completed;
        info!(job = ?self.job, from = %self.view.phase, %message, "entering failed phase");
        self.view.phase = JobPhase::Failed;
        self.view.message = message;
        self.view.is_playing = false;
        if was_completed {
            vec![Effect::UnmountMedia]
        } else {
            Vec::new()
        }
    }

    fn on_media(&mut self, signal: MediaSignal) -> Vec<Effect> {
        match signal {
            MediaSignal::MetadataLoaded { duration } => {
                if self.view.phase == JobPhase::Completed && duration.is_finite() && duration > 0.0
                {
                    self.view.duration = Some(duration);
                }
                Vec::new()
            }
            MediaSignal::TimeUpdate { position } => {
                if self.view.phase == JobPhase::Completed {
                    if let Some(duration) = self.view.duration.filter(|d| *d > 0.0) {
                        self.view.real_progress = (position / duration * 100.0).clamp(0.0, 100.0);
                    }
                }
                Vec::new()
            }
            MediaSignal::Ended => {
                self.view.is_playing = false;
                Vec::new()
            }
            MediaSignal::LoadError => {
                // A failed machine never issues further network activity.
                if self.view.phase == JobPhase::Failed {
                    Vec::new()
                } else {
                    vec![Effect::RunProbe]
                }
            }
        }
    }

    fn on_probe(&mut self, outcome: ProbeOutcome) -> Vec<Effect> {
        match outcome {
            ProbeOutcome::NotReady(report) => {
                let mut effects = self.ingest_report(report);
                if self.view.phase == JobPhase::Processing {
                    effects.push(Effect::ScheduleReattach);
                }
                effects
            }
            ProbeOutcome::Broken(message) => self.fail(message),
        }
    }

    fn on_tick(&mut self) {
        if self.view.phase != JobPhase::Processing || !self.view.is_playing {
            return;
        }
        self.view.simulated_progress += self.tick_step;
        if self.view.simulated_progress >= 100.0 {
            self.view.simulated_progress = 100.0;
            self.view.is_playing = false;
        }
    }

    fn on_intent(&mut self, intent: Intent) -> Vec<Effect> {
        match intent {
            Intent::TogglePlay => {
                self.view.is_playing = !self.view.is_playing;
                if self.view.phase == JobPhase::Completed {
                    if self.view.is_playing {
                        vec![Effect::Play]
                    } else {
                        vec![Effect::Pause]
                    }
                } else {
                    Vec::new()
                }
            }
            Intent::ToggleMute => {
                self.view.is_muted = !self.view.is_muted;
                vec![Effect::SetMuted(self.view.is_muted)]
            }
            Intent::Reset => match self.view.phase {
                JobPhase::Completed => {
                    self.view.real_progress = 0.0;
                    self.view.is_playing = true;
                    vec![Effect::SeekToStart, Effect::Play]
                }
                JobPhase::Loading | JobPhase::Processing => {
                    self.view.simulated_progress = 0.0;
                    self.view.is_playing = true;
                    Vec::new()
                }
                JobPhase::Failed => Vec::new(),
            },
            Intent::ToggleFullscreen => {
                self.view.is_fullscreen = !self.view.is_fullscreen;
                vec![Effect::SetFullscreen(self.view.is_fullscreen)]
            }
            Intent::FullscreenChanged(enabled) => {
                self.view.is_fullscreen = enabled;
                Vec::new()
            }
            Intent::SetDragging(active) => {
                self.view.is_dragging = active;
                Vec::new()
            }
        }
    }
}
