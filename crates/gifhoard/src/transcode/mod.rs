//! Transcoding service clients.
//!
//! A [`Transcoder`] turns a fetchable gif URL into hosted renditions. Each
//! pool worker is bound to one transcoder instance for its whole life.

pub mod error;
pub mod gfycat;
pub mod gifs;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use error::{Result, TranscodeError};
pub use gfycat::GfycatTranscoder;
pub use gifs::GifsTranscoder;

/// Default connect timeout for transcoder requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Renditions produced for one source gif.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodedMedia {
    pub webm_url: String,
    pub mp4_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
}

/// A transcoding service instance.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Identifies the instance in logs.
    fn name(&self) -> &str;

    /// Transcodes the gif at `url`.
    async fn transcode(&self, url: &str) -> Result<TranscodedMedia>;
}

pub(crate) fn build_http_client(request_timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()?)
}

/// Issues a GET and decodes a JSON body, treating anything but 200 as an
/// error.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T> {
    let response = http.get(url).query(query).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(TranscodeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| TranscodeError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Clamps a reported dimension into the stored range.
pub(crate) fn dimension(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
