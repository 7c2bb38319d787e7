//! Transcoder error types.

use thiserror::Error;

/// Errors returned by a transcoding service call.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// Transport failure (connect, timeout, body read).
    #[error("Transcoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-200 status.
    #[error("Transcoder request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// The service reported a failure in its response body.
    #[error("Transcoder reported an error: {0}")]
    Service(String),

    /// The response body could not be decoded.
    #[error("Failed to decode transcoder response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for transcoder operations.
pub type Result<T> = std::result::Result<T, TranscodeError>;
