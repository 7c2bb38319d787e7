//! Dedup/upsert gate between discovery and transcoding.

use chrono::{DateTime, Utc};
use log::debug;

use crate::db::gif_repo::{self, NewGif};
use crate::db::{Database, DatabaseError};
use crate::source::{Channel, DiscoveredItem};

/// Why an item was dropped before reaching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The media link is not something we can fetch as a gif.
    Ineligible,
    /// The item's sensitivity flag disagrees with its channel's class.
    SensitivityMismatch,
    /// Older than the retention window; it would be pruned again.
    Expired,
}

/// What to do with a discovered item.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Already stored and up to date.
    Skip(i64),
    /// Already stored; its nsfw flag was corrected.
    Patch(i64),
    /// Unknown item, to be transcoded and stored.
    Insert(NewGif),
    Dropped(DropReason),
}

/// Decides whether discovered items are new.
#[derive(Clone)]
pub struct Gate {
    db: Database,
    expires_before: Option<DateTime<Utc>>,
}

impl Gate {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            expires_before: None,
        }
    }

    /// Drops items created before `cutoff` instead of forwarding them.
    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.expires_before = cutoff;
        self
    }

    pub fn reconcile(&self, item: &DiscoveredItem, channel: &Channel) -> Result<Action, DatabaseError> {
        if !item.media.eligible {
            debug!("Dropping ineligible link {}", item.raw_url);
            return Ok(Action::Dropped(DropReason::Ineligible));
        }
        if item.over_18 != channel.sensitivity.is_nsfw() {
            debug!(
                "Dropping {}: over_18={} in {} channel {}",
                item.media.url, item.over_18, channel.sensitivity, channel.name
            );
            return Ok(Action::Dropped(DropReason::SensitivityMismatch));
        }
        if self.expires_before.is_some_and(|cutoff| item.created_at < cutoff) {
            debug!("Dropping {}: older than the retention window", item.media.url);
            return Ok(Action::Dropped(DropReason::Expired));
        }

        let source_url = item.source_url();
        if let Some(existing) = gif_repo::find_existing(&self.db, &item.media.url, &source_url)? {
            if existing.nsfw != item.over_18 {
                gif_repo::update_nsfw(&self.db, existing.id, item.over_18)?;
                debug!("Patched nsfw flag of gif {}", existing.id);
                return Ok(Action::Patch(existing.id));
            }
            return Ok(Action::Skip(existing.id));
        }

        Ok(Action::Insert(NewGif {
            created_at: item.created_at,
            title: item.title.clone(),
            source_url,
            url: item.media.url.clone(),
            webm_url: String::new(),
            mp4_url: String::new(),
            thumbnail_url: String::new(),
            width: 0,
            height: 0,
            nsfw: item.over_18,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InsertOutcome;
    use crate::source::{ListingItem, Sensitivity};

    fn discovered(url: &str, permalink: &str, over_18: bool) -> DiscoveredItem {
        DiscoveredItem::from_listing(
            "gifs",
            ListingItem {
                title: "cat".to_string(),
                url: url.to_string(),
                permalink: permalink.to_string(),
                created_utc: 1_700_000_000.0,
                over_18,
            },
        )
    }

    fn store(db: &Database, action: Action) -> i64 {
        let Action::Insert(gif) = action else {
            panic!("expected insert, got {:?}", action);
        };
        match gif_repo::insert_if_absent(db, &gif).unwrap() {
            InsertOutcome::Inserted(id) => id,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_item_is_inserted() {
        let db = Database::open_in_memory().unwrap();
        let gate = Gate::new(db);
        let sfw = Channel::new("gifs", Sensitivity::Sfw);

        let action = gate
            .reconcile(&discovered("http://imgur.com/gallery/xyz.gifv", "/r/gifs/xyz", false), &sfw)
            .unwrap();
        let Action::Insert(gif) = action else {
            panic!("expected insert");
        };
        assert_eq!(gif.url, "http://i.imgur.com/xyz.gif");
        assert_eq!(gif.source_url, "https://reddit.com/r/gifs/xyz");
        assert_eq!(gif.title, "cat");
        assert!(!gif.nsfw);
    }

    #[test]
    fn test_known_url_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let gate = Gate::new(db.clone());
        let sfw = Channel::new("gifs", Sensitivity::Sfw);

        let item = discovered("http://i.imgur.com/abc.gif", "/r/gifs/abc", false);
        let id = store(&db, gate.reconcile(&item, &sfw).unwrap());

        let again = discovered("http://imgur.com/abc", "/r/other/elsewhere", false);
        assert_eq!(gate.reconcile(&again, &sfw).unwrap(), Action::Skip(id));
    }

    #[test]
    fn test_known_permalink_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let gate = Gate::new(db.clone());
        let sfw = Channel::new("gifs", Sensitivity::Sfw);

        let id = store(
            &db,
            gate.reconcile(&discovered("http://i.imgur.com/abc.gif", "/r/gifs/abc", false), &sfw)
                .unwrap(),
        );
        let moved = discovered("http://i.imgur.com/new.gif", "/r/gifs/abc", false);
        assert_eq!(gate.reconcile(&moved, &sfw).unwrap(), Action::Skip(id));
    }

    #[test]
    fn test_flag_change_is_patched() {
        let db = Database::open_in_memory().unwrap();
        let gate = Gate::new(db.clone());
        let sfw = Channel::new("gifs", Sensitivity::Sfw);
        let nsfw = Channel::new("nsfw_gifs", Sensitivity::Nsfw);

        let id = store(
            &db,
            gate.reconcile(&discovered("http://i.imgur.com/abc.gif", "/r/gifs/abc", false), &sfw)
                .unwrap(),
        );

        let flagged = discovered("http://i.imgur.com/abc.gif", "/r/gifs/abc", true);
        assert_eq!(gate.reconcile(&flagged, &nsfw).unwrap(), Action::Patch(id));
        assert!(gif_repo::find_by_id(&db, id).unwrap().unwrap().nsfw);
        assert_eq!(gate.reconcile(&flagged, &nsfw).unwrap(), Action::Skip(id));
    }

    #[test]
    fn test_drops() {
        let db = Database::open_in_memory().unwrap();
        let gate = Gate::new(db);
        let sfw = Channel::new("gifs", Sensitivity::Sfw);

        assert_eq!(
            gate.reconcile(&discovered("http://i.imgur.com/a.jpg", "/r/gifs/a", false), &sfw)
                .unwrap(),
            Action::Dropped(DropReason::Ineligible)
        );
        assert_eq!(
            gate.reconcile(&discovered("http://i.imgur.com/a.gif", "/r/gifs/a", true), &sfw)
                .unwrap(),
            Action::Dropped(DropReason::SensitivityMismatch)
        );
    }

    #[test]
    fn test_items_before_cutoff_are_expired() {
        let db = Database::open_in_memory().unwrap();
        let sfw = Channel::new("gifs", Sensitivity::Sfw);
        let item = discovered("http://i.imgur.com/old.gif", "/r/gifs/old", false);

        let cutoff = item.created_at + chrono::Duration::seconds(1);
        let gate = Gate::new(db.clone()).with_cutoff(Some(cutoff));
        assert_eq!(
            gate.reconcile(&item, &sfw).unwrap(),
            Action::Dropped(DropReason::Expired)
        );

        let gate = Gate::new(db).with_cutoff(Some(item.created_at));
        assert!(matches!(gate.reconcile(&item, &sfw).unwrap(), Action::Insert(_)));
    }
}
