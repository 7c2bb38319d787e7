//! Client for the self-hosted gif upload service.
//!
//! `GET {host}/upload?u=<url>` answers with the renditions it produced:
//! `{ error, width, height, webmurl, mp4url, jpgurl }`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::error::{Result, TranscodeError};
use super::{build_http_client, dimension, get_json, TranscodedMedia, Transcoder};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    width: i64,
    #[serde(default)]
    height: i64,
    #[serde(default)]
    webmurl: String,
    #[serde(default)]
    mp4url: String,
    #[serde(default)]
    jpgurl: String,
}

/// One upload service instance.
#[derive(Debug, Clone)]
pub struct GifsTranscoder {
    http: Client,
    host: String,
}

impl GifsTranscoder {
    pub fn new(host: &str, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(request_timeout)?,
            host: host.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transcoder for GifsTranscoder {
    fn name(&self) -> &str {
        &self.host
    }

    async fn transcode(&self, url: &str) -> Result<TranscodedMedia> {
        let upload_url = format!("{}/upload", self.host);
        debug!("Uploading {} to {}", url, self.host);

        let response: UploadResponse = get_json(&self.http, &upload_url, &[("u", url)]).await?;
        if !response.error.is_empty() {
            return Err(TranscodeError::Service(response.error));
        }

        Ok(TranscodedMedia {
            webm_url: response.webmurl,
            mp4_url: response.mp4url,
            thumbnail_url: response.jpgurl,
            width: dimension(response.width),
            height: dimension(response.height),
        })
    }
}
