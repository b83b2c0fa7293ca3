use std::sync::Arc;

use job_api::{JobId, ProbeBody, RawProbe, StatusReport, VideoApi};
use tracing::{debug, warn};

/// Generic user-facing message for an asset the probe could not explain.
pub const BROKEN_MEDIA_MESSAGE: &str =
    "Failed to load video. The video file may be corrupted or inaccessible.";

/// What a failed media load turned out to mean.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// The endpoint answered with a status body: the asset is simply not
    /// materialized yet. Recoverable.
    NotReady(StatusReport),

    /// The asset is genuinely unusable. Terminal.
    Broken(String),
}

/// Classify a media-endpoint response by its declared content type.
///
/// The media and status endpoints are two representations of the same
/// resource; a JSON body carrying the status marker means "keep waiting",
/// anything else means the asset itself is bad. The native media element
/// does not expose response bodies on error, so this side fetch is the
/// only way to tell the two apart.
pub fn classify(content_type: Option<&str>, body: &[u8]) -> ProbeOutcome {
    let is_structured = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if !is_structured {
        return ProbeOutcome::Broken(BROKEN_MEDIA_MESSAGE.to_string());
    }

    match serde_json::from_slice::<ProbeBody>(body) {
        Ok(parsed) if parsed.is_status_response => {
            debug!(status = %parsed.status, "media endpoint answered with status body");
            ProbeOutcome::NotReady(parsed.into())
        }
        Ok(_) => {
            warn!("media endpoint returned JSON without the status marker");
            ProbeOutcome::Broken(BROKEN_MEDIA_MESSAGE.to_string())
        }
        Err(err) => {
            warn!(%err, "media endpoint returned unparseable JSON");
            ProbeOutcome::Broken(BROKEN_MEDIA_MESSAGE.to_string())
        }
    }
}

/// Side probe issued after a media-element load error.
pub struct MediaProbe {
    api: Arc<dyn VideoApi>,
}

impl MediaProbe {
    pub fn new(api: Arc<dyn VideoApi>) -> Self {
        Self { api }
    }

    /// Re-fetch the media resource and classify the answer. A transport
    /// failure on the probe itself is terminal, same as a broken asset.
    pub async fn run(&self, job: &JobId) -> ProbeOutcome {
        match self.api.probe_media(job).await {
            Ok(RawProbe { content_type, body }) => classify(content_type.as_deref(), &body),
            Err(err) => {
                warn!(job = %job, %err, "media probe request failed");
                ProbeOutcome::Broken(BROKEN_MEDIA_MESSAGE.to_string())
            }
        }
    }
}
