//! Cursor-threading page sequence over one channel.

use std::sync::Arc;
use tracing::debug;

use super::error::Result;
use super::types::{Channel, DiscoveredItem};
use super::ListingFetcher;

/// Position of a pager in its channel's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCursor {
    /// No request issued yet.
    Start,
    /// The next request continues after this token.
    After(String),
    /// The source reported no further pages.
    Exhausted,
}

/// One page of discovered items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub items: Vec<DiscoveredItem>,
    /// True when this page was the last one.
    pub exhausted: bool,
}

/// Lazy page sequence for a single channel.
///
/// A failed fetch leaves the cursor where it was, so calling `next_page`
/// again retries the same page.
pub struct ChannelPager {
    fetcher: Arc<dyn ListingFetcher>,
    channel: Channel,
    cursor: ChannelCursor,
}

impl ChannelPager {
    pub fn new(fetcher: Arc<dyn ListingFetcher>, channel: Channel) -> Self {
        Self {
            fetcher,
            channel,
            cursor: ChannelCursor::Start,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn cursor(&self) -> &ChannelCursor {
        &self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == ChannelCursor::Exhausted
    }

    /// Fetches the next page. Once exhausted, returns an empty exhausted
    /// page without contacting the source.
    pub async fn next_page(&mut self) -> Result<Page> {
        let after = match &self.cursor {
            ChannelCursor::Exhausted => {
                return Ok(Page {
                    items: Vec::new(),
                    exhausted: true,
                })
            }
            ChannelCursor::Start => None,
            ChannelCursor::After(token) => Some(token.as_str()),
        };

        let listing = self.fetcher.fetch_listing(&self.channel.name, after).await?;

        let exhausted = listing.after.is_empty();
        self.cursor = if exhausted {
            ChannelCursor::Exhausted
        } else {
            ChannelCursor::After(listing.after)
        };

        let items: Vec<DiscoveredItem> = listing
            .items
            .into_iter()
            .map(|item| DiscoveredItem::from_listing(&self.channel.name, item))
            .collect();

        debug!(
            channel = %self.channel.name,
            items = items.len(),
            exhausted,
            "Fetched listing page"
        );

        Ok(Page { items, exhausted })
    }

    /// Restarts the sequence from the first page.
    pub fn reset(&mut self) {
        self.cursor = ChannelCursor::Start;
    }
}
