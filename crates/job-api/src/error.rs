use thiserror::Error;

/// Failures surfaced by the job API client.
///
/// Every variant is terminal for the flow that triggered it; "asset not
/// ready yet" is not an error but a successful probe outcome.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure reaching the backend.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success HTTP status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend answered 2xx but the body could not be interpreted.
    #[error("unexpected response body: {0}")]
    InvalidResponse(String),
}
