use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{JobId, StatusReport, SubmitRequest, SubmitResponse};

/// Backend endpoint configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Read the backend URL from `BACKEND_API_URL`, falling back to the
    /// local default.
    pub fn from_env() -> Self {
        match std::env::var("BACKEND_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }
}

/// Raw answer from the media endpoint, before classification.
///
/// The media endpoint serves two representations of the same resource:
/// the video bytes once the asset exists, or a JSON status body while it
/// does not. Callers decide which one they got from the declared content
/// type.
#[derive(Debug, Clone)]
pub struct RawProbe {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Job API operations.
///
/// The player core runs against this trait so tests can substitute a
/// scripted backend.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Submit a new render job for a topic; returns the assigned job id.
    async fn submit(&self, prompt: &str) -> Result<JobId, ApiError>;

    /// One status query for a job.
    async fn fetch_status(&self, job: &JobId) -> Result<StatusReport, ApiError>;

    /// Re-fetch the media resource as plain data, for disambiguating a
    /// failed media load.
    async fn probe_media(&self, job: &JobId) -> Result<RawProbe, ApiError>;

    /// Fetch the finished asset bytes.
    async fn download(&self, job: &JobId) -> Result<Vec<u8>, ApiError>;

    /// URL of the media resource, suitable for handing to a media element
    /// or opening directly for download.
    fn media_url(&self, job: &JobId) -> String;
}

/// HTTP implementation of [`VideoApi`].
pub struct VideoApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl VideoApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            base_url: config.base_url,
            client: reqwest::Client::new(),
        }
    }

    fn status_url(&self, job: &JobId) -> String {
        format!(
            "{}/status?id={}",
            self.base_url,
            urlencoding::encode(job.as_str())
        )
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        ApiError::Status { status, message }
    }
}

#[async_trait]
impl VideoApi for VideoApiClient {
    async fn submit(&self, prompt: &str) -> Result<JobId, ApiError> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&SubmitRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(JobId(body.video_id))
    }

    async fn fetch_status(&self, job: &JobId) -> Result<StatusReport, ApiError> {
        let response = self.client.get(self.status_url(job)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn probe_media(&self, job: &JobId) -> Result<RawProbe, ApiError> {
        let response = self.client.get(self.media_url(job)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        debug!(job = %job, content_type = ?content_type, "media probe response");

        let body = response.bytes().await?.to_vec();
        Ok(RawProbe { content_type, body })
    }

    async fn download(&self, job: &JobId) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(self.media_url(job)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn media_url(&self, job: &JobId) -> String {
        format!(
            "{}/media?id={}",
            self.base_url,
            urlencoding::encode(job.as_str())
        )
    }
}
