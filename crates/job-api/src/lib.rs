/// Job API client for the video generation backend
///
/// Wire types and HTTP access for the two representations of a render job:
/// the status endpoint (always JSON) and the media endpoint (binary video
/// once the asset exists, a JSON status body while it does not).

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiConfig, RawProbe, VideoApi, VideoApiClient};
pub use error::ApiError;
pub use types::{JobId, JobPhase, ProbeBody, StatusReport, SubmitRequest, SubmitResponse};
