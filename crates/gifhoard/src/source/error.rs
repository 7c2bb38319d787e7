//! Listing source error types.

use thiserror::Error;

/// Errors that can occur while fetching a channel listing.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure (connect, timeout, body read).
    #[error("Listing request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The listing endpoint answered with a non-success status.
    #[error("Listing request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// The response body was not a listing document.
    #[error("Failed to decode listing from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for listing source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
