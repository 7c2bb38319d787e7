//! Listing sources.
//!
//! A [`ListingFetcher`] performs a single page request for one channel; a
//! [`ChannelPager`] threads the continuation cursor across requests and
//! tags each item with its normalized media link.

pub mod error;
pub mod pager;
pub mod reddit;
pub mod types;

use async_trait::async_trait;

pub use error::{Result, SourceError};
pub use pager::{ChannelCursor, ChannelPager, Page};
pub use reddit::RedditClient;
pub use types::{Channel, DiscoveredItem, Listing, ListingItem, Sensitivity};

/// Performs one listing request.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Fetches the page of `channel` that follows `after`, or the first
    /// page when `after` is `None`.
    async fn fetch_listing(&self, channel: &str, after: Option<&str>) -> Result<Listing>;
}
