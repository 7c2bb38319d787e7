//! Gif repository: canonical records, the view log and the listing
//! queries the web layer pages through.

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::LazyLock;

use super::{Database, DatabaseError};
use crate::slug;

/// Columns selected for every `GifRecord`, with the view count derived from
/// the `gif_views` log.
const RECORD_COLUMNS: &str = "g.id, g.created_at, g.title, g.source_url, g.url, g.webm_url,
     g.mp4_url, g.thumbnail_url, g.width, g.height, g.nsfw,
     (SELECT COUNT(*) FROM gif_views v WHERE v.gif_id = g.id) AS views";

/// Multiplier and modulus for the seeded shuffle order.
const SHUFFLE_MULTIPLIER: i64 = 2_654_435_761;
const SHUFFLE_MODULUS: i64 = 4_294_967_291;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// A stored gif.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GifRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub source_url: String,
    pub url: String,
    pub webm_url: String,
    pub mp4_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub nsfw: bool,
    pub views: u64,
}

impl GifRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            title: row.get("title")?,
            source_url: row.get("source_url")?,
            url: row.get("url")?,
            webm_url: row.get("webm_url")?,
            mp4_url: row.get("mp4_url")?,
            thumbnail_url: row.get("thumbnail_url")?,
            width: row.get("width")?,
            height: row.get("height")?,
            nsfw: row.get("nsfw")?,
            views: row.get("views")?,
        })
    }

    /// Site-relative permalink, e.g. `/gif/42-funny-cat`.
    pub fn permalink(&self) -> String {
        format!("/gif/{}", slug::slug(self.id, &self.title))
    }

    /// Alternate renditions that were produced by the transcoder.
    pub fn alternate_urls(&self) -> Vec<&str> {
        [self.webm_url.as_str(), self.mp4_url.as_str()]
            .into_iter()
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Fields for a record about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGif {
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub source_url: String,
    pub url: String,
    pub webm_url: String,
    pub mp4_url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,
    pub nsfw: bool,
}

/// Identity and mutable flag of a record matched during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingGif {
    pub id: i64,
    pub nsfw: bool,
}

/// Result of [`insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A record with the same url or source url already existed.
    AlreadyStored(i64),
}

/// Listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Newest,
    Top,
    Search(String),
    /// Deterministic shuffle; the same seed yields the same page sequence.
    Shuffle(u32),
}

/// A page request against the listing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifQuery {
    pub nsfw: bool,
    pub order: Order,
    /// 1-based page number. Values below 1 are treated as 1.
    pub page: u32,
    pub page_size: u32,
}

impl GifQuery {
    pub fn new(nsfw: bool, order: Order) -> Self {
        Self {
            nsfw,
            order,
            page: 1,
            page_size: 20,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }
}

fn find_existing_in(
    conn: &Connection,
    url: &str,
    source_url: &str,
) -> Result<Option<ExistingGif>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, nsfw FROM gifs WHERE url = ?1 OR source_url = ?2 ORDER BY id LIMIT 1",
        params![url, source_url],
        |r| {
            Ok(ExistingGif {
                id: r.get(0)?,
                nsfw: r.get(1)?,
            })
        },
    )
    .optional()
}

/// Looks up a record by canonical url or source permalink.
///
/// Should both columns match different rows (only possible in data written
/// before the unique indexes existed), the lowest id wins.
pub fn find_existing(
    db: &Database,
    url: &str,
    source_url: &str,
) -> Result<Option<ExistingGif>, DatabaseError> {
    db.with_conn(|conn| Ok(find_existing_in(conn, url, source_url)?))
}

/// Sets the nsfw flag of a record. Returns whether a row changed.
pub fn update_nsfw(db: &Database, id: i64, nsfw: bool) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE gifs SET nsfw = ?2 WHERE id = ?1 AND nsfw != ?2",
            params![id, nsfw],
        )?;
        Ok(changed > 0)
    })
}

/// Inserts `gif` unless a record with the same url or source url exists.
///
/// The existence check and the insert share one transaction, and the
/// unique indexes turn a conflicting writer from another process into
/// `AlreadyStored` instead of a duplicate row.
pub fn insert_if_absent(db: &Database, gif: &NewGif) -> Result<InsertOutcome, DatabaseError> {
    db.with_transaction(|conn| {
        if let Some(existing) = find_existing_in(conn, &gif.url, &gif.source_url)? {
            return Ok(InsertOutcome::AlreadyStored(existing.id));
        }

        let inserted = conn.execute(
            "INSERT INTO gifs (created_at, title, source_url, url, webm_url, mp4_url,
             thumbnail_url, width, height, nsfw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT DO NOTHING",
            params![
                gif.created_at,
                gif.title,
                gif.source_url,
                gif.url,
                gif.webm_url,
                gif.mp4_url,
                gif.thumbnail_url,
                gif.width,
                gif.height,
                gif.nsfw,
            ],
        )?;

        if inserted == 0 {
            let existing = find_existing_in(conn, &gif.url, &gif.source_url)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            return Ok(InsertOutcome::AlreadyStored(existing.id));
        }

        Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
    })
}

/// Finds a record by id without touching the view log.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<GifRecord>, DatabaseError> {
    db.with_conn(|conn| Ok(find_by_id_in(conn, id)?))
}

fn find_by_id_in(conn: &Connection, id: i64) -> Result<Option<GifRecord>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM gifs g WHERE g.id = ?1", RECORD_COLUMNS),
        params![id],
        GifRecord::from_row,
    )
    .optional()
}

/// Looks up a record for display and appends one view event for it.
///
/// The returned view count includes the view recorded by this call.
pub fn get_and_record_view(
    db: &Database,
    id: i64,
    viewed_at: DateTime<Utc>,
) -> Result<Option<GifRecord>, DatabaseError> {
    db.with_transaction(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM gifs WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        if !exists {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO gif_views (gif_id, created_at) VALUES (?1, ?2)",
            params![id, viewed_at],
        )?;

        Ok(find_by_id_in(conn, id)?)
    })
}

/// Returns one page of records.
pub fn list(db: &Database, query: &GifQuery) -> Result<Vec<GifRecord>, DatabaseError> {
    let limit = i64::from(query.page_size);
    let offset = query.offset();

    db.with_conn(|conn| {
        let rows = match &query.order {
            Order::Search(text) => match search_expression(text) {
                Some(expression) => {
                    let sql = format!(
                        "SELECT {} FROM gif_search
                         JOIN gifs g ON g.id = gif_search.rowid
                         WHERE gif_search MATCH ?1 AND g.nsfw = ?2
                         ORDER BY bm25(gif_search), g.id
                         LIMIT ?3 OFFSET ?4",
                        RECORD_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map(
                            params![expression, query.nsfw, limit, offset],
                            GifRecord::from_row,
                        )?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => list_ordered(conn, query.nsfw, "g.created_at DESC, g.id DESC", limit, offset)?,
            },
            Order::Newest => {
                list_ordered(conn, query.nsfw, "g.created_at DESC, g.id DESC", limit, offset)?
            }
            Order::Top => list_ordered(conn, query.nsfw, "views DESC, g.id ASC", limit, offset)?,
            Order::Shuffle(seed) => {
                let order_by = format!(
                    "((g.id * {} + {}) % {}), g.id",
                    SHUFFLE_MULTIPLIER, seed, SHUFFLE_MODULUS
                );
                list_ordered(conn, query.nsfw, &order_by, limit, offset)?
            }
        };
        Ok(rows)
    })
}

fn list_ordered(
    conn: &Connection,
    nsfw: bool,
    order_by: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<GifRecord>, rusqlite::Error> {
    let sql = format!(
        "SELECT {} FROM gifs g WHERE g.nsfw = ?1 ORDER BY {} LIMIT ?2 OFFSET ?3",
        RECORD_COLUMNS, order_by
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![nsfw, limit, offset], GifRecord::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Builds an FTS5 expression that requires every word of `text`.
///
/// Words are quoted so that user input can never be read as FTS syntax.
fn search_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = RE_WORD
        .find_iter(text)
        .map(|m| format!("\"{}\"", m.as_str()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

/// Picks one record of the given class at random.
pub fn random(db: &Database, nsfw: bool) -> Result<Option<GifRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM gifs g WHERE g.nsfw = ?1 ORDER BY random() LIMIT 1",
                    RECORD_COLUMNS
                ),
                params![nsfw],
                GifRecord::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Counts all stored records.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM gifs", [], |r| r.get(0))?;
        Ok(count)
    })
}

/// Deletes records created before `cutoff`, along with their view events.
/// Returns the number of records removed.
pub fn prune_older_than(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
    db.with_transaction(|conn| {
        conn.execute(
            "DELETE FROM gif_views WHERE gif_id IN (SELECT id FROM gifs WHERE created_at < ?1)",
            params![cutoff],
        )?;
        let deleted = conn.execute("DELETE FROM gifs WHERE created_at < ?1", params![cutoff])?;
        Ok(deleted as u64)
    })
}
