//! Builders for listing data.

#![allow(dead_code)]

use gifhoard::source::ListingItem;

/// Builder for a single listing item.
pub struct ItemBuilder {
    item: ListingItem,
}

impl ItemBuilder {
    pub fn new(title: &str, url: &str, permalink: &str) -> Self {
        Self {
            item: ListingItem {
                title: title.to_string(),
                url: url.to_string(),
                permalink: permalink.to_string(),
                created_utc: 1_767_225_600.0,
                over_18: false,
            },
        }
    }

    pub fn nsfw(mut self) -> Self {
        self.item.over_18 = true;
        self
    }

    pub fn created_utc(mut self, secs: f64) -> Self {
        self.item.created_utc = secs;
        self
    }

    pub fn build(self) -> ListingItem {
        self.item
    }
}

/// Items for one page, without a cursor. The fake fetcher assigns cursors.
pub struct PageBuilder {
    items: Vec<ListingItem>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn item(mut self, item: ItemBuilder) -> Self {
        self.items.push(item.build());
        self
    }

    /// Adds `count` distinct direct gif links named after `prefix`.
    pub fn gifs(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            let key = format!("{}{}", prefix, i);
            self.items.push(
                ItemBuilder::new(
                    &key,
                    &format!("http://i.imgur.com/{}.gif", key),
                    &format!("/r/gifs/comments/{}", key),
                )
                .build(),
            );
        }
        self
    }

    pub fn build(self) -> Vec<ListingItem> {
        self.items
    }
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
