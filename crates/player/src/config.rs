use std::time::Duration;

/// Player timing and presentation knobs.
///
/// The poll delay and the forced-reload delay happen to share a default
/// but are deliberately separate settings.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Delay between status queries while the job is processing.
    pub poll_delay: Duration,

    /// Delay before re-attaching the media source after a not-ready probe.
    pub reload_delay: Duration,

    /// Cadence of the simulated-progress tick.
    pub tick_interval: Duration,

    /// Simulated-progress increment per tick, in percent.
    pub tick_step: f64,

    /// Nominal length of the processing placeholder timeline, in seconds.
    pub placeholder_secs: u64,

    /// Caption sequence shown while processing, indexed by progress.
    pub captions: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_millis(3000),
            reload_delay: Duration::from_millis(3000),
            tick_interval: Duration::from_millis(100),
            tick_step: 0.5,
            placeholder_secs: 120,
            captions: Vec::new(),
        }
    }
}

impl PlayerConfig {
    /// Elapsed/total labels for the processing placeholder timeline.
    ///
    /// The placeholder pretends to be `placeholder_secs` long; the real
    /// timeline takes over once metadata is loaded.
    pub fn placeholder_labels(&self, progress: f64) -> (String, String) {
        let elapsed = (progress.clamp(0.0, 100.0) / 100.0 * self.placeholder_secs as f64) as u64;
        (format!("{elapsed}s"), format!("{}s", self.placeholder_secs))
    }

    /// Default captions for a topic, in display order.
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.captions = vec![
            format!("Welcome to this educational video about {topic}"),
            "Let's explore the fundamental concepts together".to_string(),
            "This visualization will help you understand the key principles".to_string(),
            "Notice how the elements interact with each other".to_string(),
            "This demonstrates the core theory in action".to_string(),
        ];
        self
    }
}

/// Format seconds as `M:SS` for tooltips and time labels.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
