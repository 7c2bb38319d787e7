//! HTTP listing client for a reddit-style `top.json` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::{Result, SourceError};
use super::types::{Listing, ListingItem};
use super::ListingFetcher;

/// Default connect timeout for listing requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire shape of the listing document.
#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: ListingChildData,
}

#[derive(Debug, Deserialize)]
struct ListingChildData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    over_18: bool,
}

impl From<ListingResponse> for Listing {
    fn from(response: ListingResponse) -> Self {
        Listing {
            after: response.data.after.unwrap_or_default(),
            items: response
                .data
                .children
                .into_iter()
                .map(|child| ListingItem {
                    title: child.data.title,
                    url: child.data.url,
                    permalink: child.data.permalink,
                    created_utc: child.data.created_utc,
                    over_18: child.data.over_18,
                })
                .collect(),
        }
    }
}

/// Fetches `GET {base_url}/r/{channel}/top.json[?after=<cursor>]`.
#[derive(Debug, Clone)]
pub struct RedditClient {
    http: Client,
    base_url: String,
}

impl RedditClient {
    /// Builds a client with connect and request timeouts and the given
    /// User-Agent.
    pub fn new(base_url: &str, user_agent: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn listing_url(&self, channel: &str) -> String {
        format!("{}/r/{}/top.json", self.base_url, channel)
    }
}

#[async_trait]
impl ListingFetcher for RedditClient {
    async fn fetch_listing(&self, channel: &str, after: Option<&str>) -> Result<Listing> {
        let url = self.listing_url(channel);
        let mut request = self.http.get(&url);
        if let Some(after) = after.filter(|a| !a.is_empty()) {
            request = request.query(&[("after", after)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ListingResponse =
            serde_json::from_str(&body).map_err(|source| SourceError::Decode {
                url: url.clone(),
                source,
            })?;

        let listing = Listing::from(parsed);
        debug!(
            "Fetched {} items from /r/{} (after: {:?})",
            listing.items.len(),
            channel,
            listing.after
        );
        Ok(listing)
    }
}
