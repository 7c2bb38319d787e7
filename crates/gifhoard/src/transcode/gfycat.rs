//! Client for the gfycat transcode API.
//!
//! Two calls per gif: `GET {upload_base}/transcode?fetchUrl=<url>` starts
//! the transcode and names the result, then
//! `GET {api_base}/cajax/get/<gfyname>` reports its dimensions.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::error::{Result, TranscodeError};
use super::{build_http_client, dimension, get_json, TranscodedMedia, Transcoder};

#[derive(Debug, Deserialize)]
struct TranscodeResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    gfyname: String,
    #[serde(default, rename = "webmUrl")]
    webm_url: String,
    #[serde(default, rename = "mp4Url")]
    mp4_url: String,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    #[serde(default, rename = "gfyItem")]
    gfy_item: GfyItem,
}

#[derive(Debug, Default, Deserialize)]
struct GfyItem {
    #[serde(default)]
    width: i64,
    #[serde(default)]
    height: i64,
}

/// One gfycat endpoint pair.
#[derive(Debug, Clone)]
pub struct GfycatTranscoder {
    http: Client,
    upload_base: String,
    api_base: String,
}

impl GfycatTranscoder {
    pub fn new(upload_base: &str, api_base: &str, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http_client(request_timeout)?,
            upload_base: upload_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transcoder for GfycatTranscoder {
    fn name(&self) -> &str {
        &self.upload_base
    }

    async fn transcode(&self, url: &str) -> Result<TranscodedMedia> {
        let transcode_url = format!("{}/transcode", self.upload_base);
        debug!("Requesting gfycat transcode of {}", url);

        let uploaded: TranscodeResponse =
            get_json(&self.http, &transcode_url, &[("fetchUrl", url)]).await?;
        if !uploaded.error.is_empty() {
            return Err(TranscodeError::Service(uploaded.error));
        }
        if uploaded.gfyname.is_empty() {
            return Err(TranscodeError::Service(format!(
                "no gfyname returned for {}",
                url
            )));
        }

        let item_url = format!("{}/cajax/get/{}", self.api_base, uploaded.gfyname);
        let item: ItemResponse = get_json(&self.http, &item_url, &[]).await?;

        Ok(TranscodedMedia {
            webm_url: uploaded.webm_url,
            mp4_url: uploaded.mp4_url,
            thumbnail_url: String::new(),
            width: dimension(item.gfy_item.width),
            height: dimension(item.gfy_item.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transcoder(server: &MockServer) -> GfycatTranscoder {
        GfycatTranscoder::new(&server.uri(), &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_transcode_and_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcode"))
            .and(query_param("fetchUrl", "http://i.imgur.com/abc.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "gfyname": "HappyLittleCat",
                "webmUrl": "http://zippy.gfycat.com/HappyLittleCat.webm",
                "mp4Url": "http://fat.gfycat.com/HappyLittleCat.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cajax/get/HappyLittleCat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "gfyItem": { "width": 320, "height": 240 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let media = transcoder(&server)
            .transcode("http://i.imgur.com/abc.gif")
            .await
            .unwrap();
        assert_eq!(media.webm_url, "http://zippy.gfycat.com/HappyLittleCat.webm");
        assert_eq!(media.mp4_url, "http://fat.gfycat.com/HappyLittleCat.mp4");
        assert_eq!((media.width, media.height), (320, 240));
    }

    #[tokio::test]
    async fn test_upload_error_skips_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcode"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "could not fetch"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cajax/get/HappyLittleCat"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = transcoder(&server).transcode("http://x/a.gif").await.unwrap_err();
        assert!(matches!(err, TranscodeError::Service(_)));
    }

    #[tokio::test]
    async fn test_lookup_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcode"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"gfyname": "Abc"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cajax/get/Abc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = transcoder(&server).transcode("http://x/a.gif").await.unwrap_err();
        assert!(matches!(err, TranscodeError::Status { status: 404, .. }));
    }
}
