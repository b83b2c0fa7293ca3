use std::sync::Arc;

use job_api::{JobId, JobPhase, VideoApi};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PlayerConfig;
use crate::media::{MediaSignal, MediaSurface};
use crate::poller::StatusPoller;
use crate::probe::MediaProbe;
use crate::state::{Effect, Intent, PlaybackStateMachine, PlaybackView, PlayerEvent};

/// Optional page capabilities.
///
/// The full player page runs with both on; the basic variant turns both
/// off and keeps click-to-seek only.
#[derive(Debug, Clone, Copy)]
pub struct PlayerCapabilities {
    pub dragging: bool,
    pub fullscreen: bool,
}

impl PlayerCapabilities {
    pub fn basic() -> Self {
        Self {
            dragging: false,
            fullscreen: false,
        }
    }
}

impl Default for PlayerCapabilities {
    fn default() -> Self {
        Self {
            dragging: true,
            fullscreen: true,
        }
    }
}

/// Cheap handle for feeding the player from the host.
#[derive(Clone)]
pub struct PlayerHandle {
    events: UnboundedSender<PlayerEvent>,
}

impl PlayerHandle {
    /// Forward a media-element notification, tagged with the job the
    /// element was mounted for.
    pub fn media_signal(&self, job: JobId, signal: MediaSignal) {
        let _ = self.events.send(PlayerEvent::Media { job, signal });
    }

    pub fn intent(&self, intent: Intent) {
        let _ = self.events.send(PlayerEvent::Intent(intent));
    }
}

/// Event-loop driver around the state machine.
///
/// Owns the poller session, the simulated-progress clock, and the forced
/// reload timer, and applies every effect to the media surface. The
/// machine decides; this type schedules.
pub struct Player {
    api: Arc<dyn VideoApi>,
    surface: Arc<dyn MediaSurface>,
    config: PlayerConfig,
    capabilities: PlayerCapabilities,
    machine: PlaybackStateMachine,
    events_tx: UnboundedSender<PlayerEvent>,
    events_rx: UnboundedReceiver<PlayerEvent>,
    /// Cancelled on teardown; sessions derive from it.
    root: CancellationToken,
    /// Cancelled whenever the tracked job changes, or on failure.
    session: CancellationToken,
    /// Cancelled as soon as the phase is terminal; owns only the poll leg.
    poll: CancellationToken,
}

impl Player {
    pub fn new(
        api: Arc<dyn VideoApi>,
        surface: Arc<dyn MediaSurface>,
        config: PlayerConfig,
        capabilities: PlayerCapabilities,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let machine = PlaybackStateMachine::new(config.captions.clone(), config.tick_step);
        let root = CancellationToken::new();
        let session = root.child_token();
        let poll = session.child_token();
        Self {
            api,
            surface,
            config,
            capabilities,
            machine,
            events_tx,
            events_rx,
            root,
            session,
            poll,
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn view(&self) -> &PlaybackView {
        self.machine.view()
    }

    pub fn phase(&self) -> JobPhase {
        self.machine.phase()
    }

    pub fn controls_enabled(&self) -> bool {
        self.machine.controls_enabled()
    }

    pub fn current_caption(&self) -> Option<&str> {
        self.machine.current_caption()
    }

    pub fn snapshot(&self) -> crate::state::PlaybackSnapshot {
        self.machine.snapshot()
    }

    /// URL a user can open directly to save the finished asset.
    pub fn download_url(&self) -> Option<String> {
        self.machine.job().map(|job| self.api.media_url(job))
    }

    /// Start tracking a job, superseding any previous one.
    ///
    /// The old session token is cancelled first, which drops its scheduled
    /// poll, probe, and reload timers in flight; anything already sent is
    /// discarded by the machine's job-id guard.
    pub fn watch(&mut self, job: JobId) {
        self.session.cancel();
        self.session = self.root.child_token();
        self.poll = self.session.child_token();

        let effects = self.machine.begin(job.clone(), self.api.media_url(&job));
        self.execute(effects);

        StatusPoller::spawn(
            self.api.clone(),
            job,
            self.config.poll_delay,
            self.events_tx.clone(),
            self.poll.clone(),
        );
    }

    /// Stop everything; the player is done after this.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Drive the player until the job reaches a terminal phase.
    ///
    /// This is the headless mode: it stops as soon as the backend is done
    /// (or dead). UI hosts use [`run`](Self::run), which keeps serving
    /// media and user events through playback.
    pub async fn run_until_terminal(&mut self) -> JobPhase {
        while !self.machine.phase().is_terminal() {
            if !self.step().await {
                break;
            }
        }
        self.machine.phase()
    }

    /// Drive the player until shutdown.
    pub async fn run(&mut self) {
        while self.step().await {}
    }

    /// Serve one event or tick; false once the player is shut down.
    async fn step(&mut self) -> bool {
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tick.reset();
        let root = self.root.clone();

        tokio::select! {
            _ = root.cancelled() => false,
            event = self.events_rx.recv() => match event {
                Some(event) => {
                    self.dispatch(event);
                    true
                }
                None => false,
            },
            _ = tick.tick() => {
                self.dispatch(PlayerEvent::Tick);
                true
            }
        }
    }

    /// Apply one event and carry out whatever it demanded.
    pub fn dispatch(&mut self, event: PlayerEvent) {
        if let PlayerEvent::Intent(Intent::ToggleFullscreen) = event {
            if !self.capabilities.fullscreen {
                debug!("fullscreen capability disabled, intent dropped");
                return;
            }
        }
        let effects = self.machine.apply(event);
        self.execute(effects);

        // Terminal phases wind the background work down: completed keeps
        // the session alive for probes, failed issues nothing further.
        match self.machine.phase() {
            JobPhase::Completed => self.poll.cancel(),
            JobPhase::Failed => self.session.cancel(),
            _ => {}
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::MountMedia { url } => self.surface.mount(&url),
                Effect::UnmountMedia => self.surface.unmount(),
                Effect::RunProbe => self.spawn_probe(),
                Effect::ScheduleReattach => self.spawn_reattach(),
                Effect::ReattachMedia => {
                    if let Err(err) = self.surface.reattach() {
                        warn!(%err, "media re-attach failed");
                    }
                }
                Effect::Play => {
                    if let Err(err) = self.surface.play() {
                        warn!(%err, "play failed");
                    }
                }
                Effect::Pause => {
                    if let Err(err) = self.surface.pause() {
                        warn!(%err, "pause failed");
                    }
                }
                Effect::SetMuted(muted) => self.surface.set_muted(muted),
                Effect::SeekToStart => self.surface.set_position(0.0),
                Effect::SetFullscreen(enabled) => {
                    if let Err(err) = self.surface.set_fullscreen(enabled) {
                        warn!(%err, "fullscreen change failed");
                    }
                }
            }
        }
    }

    fn spawn_probe(&self) {
        let Some(job) = self.machine.job().cloned() else {
            return;
        };
        let probe = MediaProbe::new(self.api.clone());
        let events = self.events_tx.clone();
        let cancel = self.session.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                outcome = probe.run(&job) => {
                    let _ = events.send(PlayerEvent::Probe { job, outcome });
                }
            }
        });
    }

    /// Arm the forced-reload timer. It reports back as an event rather
    /// than touching the surface itself, so the machine can void a timer
    /// whose phase has moved on.
    fn spawn_reattach(&self) {
        let Some(job) = self.machine.job().cloned() else {
            return;
        };
        let events = self.events_tx.clone();
        let delay = self.config.reload_delay;
        let cancel = self.session.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    debug!(job = %job, "forced-reload delay elapsed");
                    let _ = events.send(PlayerEvent::ReattachDue { job });
                }
            }
        });
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
