//! Download result repository for the append-only `download_results` ledger.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw download result row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResultRow {
    pub id: i64,
    pub url: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl DownloadResultRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            url: row.get("url")?,
            success: row.get("success")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Appends one attempt outcome for `url`. Returns the new row id.
pub fn insert(
    db: &Database,
    url: &str,
    success: bool,
    created_at: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO download_results (url, success, created_at) VALUES (?1, ?2, ?3)",
            params![url, success, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds the most recent attempt for `url`.
///
/// Rows written in the same instant are ordered by insertion id so the
/// answer never depends on the query plan.
pub fn find_latest(db: &Database, url: &str) -> Result<Option<DownloadResultRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT id, url, success, created_at FROM download_results
                 WHERE url = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                params![url],
                DownloadResultRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Counts all attempts recorded for `url`.
pub fn count_by_url(db: &Database, url: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM download_results WHERE url = ?1",
            params![url],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Counts attempts by outcome across the whole ledger.
pub fn count_by_outcome(db: &Database, success: bool) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM download_results WHERE success = ?1",
            params![success],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
