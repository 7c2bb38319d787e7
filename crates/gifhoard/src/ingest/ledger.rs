//! Negative cache over the download results ledger.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::db::{download_repo, Database, DatabaseError};

/// How long a failed attempt keeps a URL from being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// A failed URL is never attempted again.
    #[default]
    Never,
    /// A failed URL becomes eligible again once its latest failure is this old.
    After(Duration),
}

impl RetryPolicy {
    /// Builds a policy from an optional day count.
    pub fn from_days(days: Option<u32>) -> Self {
        match days {
            Some(d) => RetryPolicy::After(Duration::days(i64::from(d))),
            None => RetryPolicy::Never,
        }
    }
}

/// Records transcode attempts and answers whether a URL may be attempted.
#[derive(Clone)]
pub struct DownloadLedger {
    db: Database,
    policy: RetryPolicy,
}

impl DownloadLedger {
    pub fn new(db: Database, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns false when the most recent attempt for `url` failed and the
    /// policy still holds it back.
    pub fn should_attempt(&self, url: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let Some(latest) = download_repo::find_latest(&self.db, url)? else {
            return Ok(true);
        };
        if latest.success {
            return Ok(true);
        }

        let allowed = match self.policy {
            RetryPolicy::Never => false,
            RetryPolicy::After(wait) => now - latest.created_at >= wait,
        };
        if !allowed {
            debug!("Skipping {}: last attempt failed at {}", url, latest.created_at);
        }
        Ok(allowed)
    }

    /// Appends one attempt outcome.
    pub fn record(&self, url: &str, success: bool, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        download_repo::insert(&self.db, url, success, at)?;
        Ok(())
    }
}
