//! Channels and the items discovered in their listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{self, Normalized};

/// Prefix joined with a listing permalink to build the stored source URL.
pub const PERMALINK_BASE: &str = "https://reddit.com";

/// Which partition a channel feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Sfw,
    Nsfw,
}

impl Sensitivity {
    pub fn is_nsfw(self) -> bool {
        matches!(self, Sensitivity::Nsfw)
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensitivity::Sfw => write!(f, "sfw"),
            Sensitivity::Nsfw => write!(f, "nsfw"),
        }
    }
}

/// A named external feed and the sensitivity class it is declared to carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    pub name: String,
    pub sensitivity: Sensitivity,
}

impl Channel {
    pub fn new(name: impl Into<String>, sensitivity: Sensitivity) -> Self {
        Self {
            name: name.into(),
            sensitivity,
        }
    }
}

/// One item from a listing page, as reported by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    pub title: String,
    pub url: String,
    pub permalink: String,
    /// Seconds since the epoch.
    pub created_utc: f64,
    pub over_18: bool,
}

/// One fetched page: its items in source order and the continuation token.
/// An empty `after` means the channel has no further pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Listing {
    pub after: String,
    pub items: Vec<ListingItem>,
}

/// A listing item tagged with its channel and its normalized media link.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredItem {
    pub title: String,
    pub raw_url: String,
    pub media: Normalized,
    pub permalink: String,
    pub created_at: DateTime<Utc>,
    pub over_18: bool,
    pub channel: String,
}

impl DiscoveredItem {
    pub fn from_listing(channel: &str, item: ListingItem) -> Self {
        let media = normalize::normalize(&item.url);
        let created_at =
            DateTime::from_timestamp(item.created_utc as i64, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            title: item.title,
            raw_url: item.url,
            media,
            permalink: item.permalink,
            created_at,
            over_18: item.over_18,
            channel: channel.to_string(),
        }
    }

    /// Absolute permalink stored as the record's source URL.
    pub fn source_url(&self) -> String {
        format!("{}{}", PERMALINK_BASE, self.permalink)
    }
}
