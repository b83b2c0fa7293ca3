use anyhow::Result;

/// The media-hosting collaborator.
///
/// One implementation wraps whatever actually renders video (a browser
/// media element, a native pipeline); the player core only drives this
/// interface. The host owns the element for the page's lifetime; nothing
/// else mutates its playback position.
pub trait MediaSurface: Send + Sync {
    /// Point the element at a source URL and start loading it.
    fn mount(&self, url: &str);

    /// Detach the current source.
    fn unmount(&self);

    /// Clear and restore the current source so the next load bypasses a
    /// cached failure.
    fn reattach(&self) -> Result<()>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn set_muted(&self, muted: bool);

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    fn set_position(&self, seconds: f64);

    /// Duration in seconds once metadata is loaded; `None` before that.
    fn duration(&self) -> Option<f64>;

    fn set_fullscreen(&self, enabled: bool) -> Result<()>;
}

/// Notifications the host forwards from the media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    /// Metadata loaded; duration is now known.
    MetadataLoaded { duration: f64 },

    /// Playback position advanced.
    TimeUpdate { position: f64 },

    /// Playback reached the end.
    Ended,

    /// The element failed to load its source.
    LoadError,
}

/// Surface with no real media behind it, for headless runs.
///
/// Reports no duration, so every seek stays a no-op.
#[derive(Debug, Default)]
pub struct NullMediaSurface;

impl MediaSurface for NullMediaSurface {
    fn mount(&self, _url: &str) {}

    fn unmount(&self) {}

    fn reattach(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self) -> Result<()> {
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        Ok(())
    }

    fn set_muted(&self, _muted: bool) {}

    fn position(&self) -> f64 {
        0.0
    }

    fn set_position(&self, _seconds: f64) {}

    fn duration(&self) -> Option<f64> {
        None
    }

    fn set_fullscreen(&self, _enabled: bool) -> Result<()> {
        Ok(())
    }
}
