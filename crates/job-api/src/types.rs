use serde::{Deserialize, Serialize};

/// Render job identifier, assigned by the backend on submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Coarse lifecycle state of a job as seen by the client.
///
/// `Loading` means the job has not been queried yet; the backend itself
/// only ever reports the other three. Terminal states never revert within
/// one poll sequence, and `Failed` is reachable from any non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Loading,
    Processing,
    Completed,
    Failed,
}

impl JobPhase {
    /// Completed and failed jobs are never polled again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Loading => "loading",
            JobPhase::Processing => "processing",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answer from the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobPhase,

    /// Human-readable progress description, display-only.
    #[serde(default)]
    pub message: String,

    /// Opaque reference to the finished asset; null until completed.
    #[serde(rename = "mediaRef", default)]
    pub media_ref: Option<String>,
}

impl StatusReport {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobPhase::Failed,
            message: message.into(),
            media_ref: None,
        }
    }
}

/// JSON body the media endpoint serves while the asset is not materialized.
///
/// The `isStatusResponse` marker is what distinguishes "not ready yet"
/// from a genuinely broken asset; a JSON body without it is treated as
/// broken.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeBody {
    #[serde(rename = "isStatusResponse", default)]
    pub is_status_response: bool,

    pub status: JobPhase,

    #[serde(default)]
    pub message: String,

    #[serde(rename = "mediaRef", default)]
    pub media_ref: Option<String>,
}

impl From<ProbeBody> for StatusReport {
    fn from(body: ProbeBody) -> Self {
        Self {
            status: body.status,
            message: body.message,
            media_ref: body.media_ref,
        }
    }
}

/// Job submission request.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub prompt: String,
}

/// Job submission answer.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "videoId")]
    pub video_id: String,

    #[serde(default)]
    pub message: Option<String>,
}
