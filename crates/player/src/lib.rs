/// Playback core for AI-generated video jobs
///
/// Tracks a render job from submission to playback: polls the status
/// endpoint while the backend works, recovers from the media endpoint
/// answering with a status body instead of video, and drives seek/scrub
/// input against the mounted asset. The media element and pointer input
/// live behind traits so the same core backs the UI page and headless
/// runs.

pub mod config;
pub mod media;
pub mod player;
pub mod poller;
pub mod probe;
pub mod scrub;
pub mod state;

pub use config::{format_time, PlayerConfig};
pub use media::{MediaSignal, MediaSurface, NullMediaSurface};
pub use player::{Player, PlayerCapabilities, PlayerHandle};
pub use poller::StatusPoller;
pub use probe::{classify, MediaProbe, ProbeOutcome, BROKEN_MEDIA_MESSAGE};
pub use scrub::{
    CaptureGuard, NullPointerHost, PointerHost, ScrubController, SeekOutcome, TrackRect,
};
pub use state::{
    Effect, Intent, PlaybackSnapshot, PlaybackStateMachine, PlaybackView, PlayerEvent,
};
