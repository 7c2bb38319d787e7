//! Test harness for running sweeps against scripted collaborators.
//!
//! The listing source and the transcoder are in-process fakes that count
//! their calls, so tests can assert on what the pipeline asked for as well
//! as what it stored.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use gifhoard::ingest::{ChannelScheduler, SchedulerSettings};
use gifhoard::source::{Channel, Listing, ListingFetcher, ListingItem, SourceError};
use gifhoard::transcode::{TranscodeError, TranscodedMedia, Transcoder};
use gifhoard::Database;

/// Serves pages per channel, chaining them with `page-<n>` cursors.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, Vec<Vec<ListingItem>>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeFetcher {
    pub fn set_pages(&self, channel: &str, pages: Vec<Vec<ListingItem>>) {
        self.pages.lock().unwrap().insert(channel.to_string(), pages);
    }

    pub fn fail_channel(&self, channel: &str) {
        self.failing.lock().unwrap().insert(channel.to_string());
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, channel: &str) -> usize {
        self.calls().iter().filter(|(c, _)| c == channel).count()
    }
}

#[async_trait]
impl ListingFetcher for FakeFetcher {
    async fn fetch_listing(
        &self,
        channel: &str,
        after: Option<&str>,
    ) -> gifhoard::source::Result<Listing> {
        self.calls
            .lock()
            .unwrap()
            .push((channel.to_string(), after.map(str::to_string)));

        if self.failing.lock().unwrap().contains(channel) {
            return Err(SourceError::Status {
                url: format!("/r/{}/top.json", channel),
                status: 503,
            });
        }

        let index = match after {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .expect("cursor issued by this fetcher"),
        };

        let pages = self.pages.lock().unwrap();
        let channel_pages = pages.get(channel).cloned().unwrap_or_default();
        let items = channel_pages.get(index).cloned().unwrap_or_default();
        let after = if index + 1 < channel_pages.len() {
            format!("page-{}", index + 1)
        } else {
            String::new()
        };

        Ok(Listing { after, items })
    }
}

/// Produces fixed renditions, failing for URLs marked as broken.
#[derive(Default)]
pub struct FakeTranscoder {
    broken: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    /// Raised after the first call when set.
    stop_after_first: Mutex<Option<Arc<AtomicBool>>>,
}

impl FakeTranscoder {
    pub fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }

    pub fn raise_after_first_call(&self, flag: Arc<AtomicBool>) {
        *self.stop_after_first.lock().unwrap() = Some(flag);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn transcode(&self, url: &str) -> gifhoard::transcode::Result<TranscodedMedia> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(flag) = self.stop_after_first.lock().unwrap().as_ref() {
            flag.store(true, Ordering::Release);
        }

        if self.broken.lock().unwrap().contains(url) {
            return Err(TranscodeError::Service(format!("cannot fetch {}", url)));
        }

        let stem = url.trim_end_matches(".gif");
        Ok(TranscodedMedia {
            webm_url: format!("{}.webm", stem),
            mp4_url: format!("{}.mp4", stem),
            thumbnail_url: format!("{}.jpg", stem),
            width: 480,
            height: 270,
        })
    }
}

/// Isolated environment: a store in a temp dir plus the two fakes.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
    pub fetcher: Arc<FakeFetcher>,
    pub transcoder: Arc<FakeTranscoder>,
    pub shutdown: Arc<AtomicBool>,
    /// Number of workers, all bound to the same fake transcoder.
    pub workers: usize,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("gifhoard.db");
        let db = Database::open(&db_path).expect("Failed to open test store");

        Self {
            temp_dir,
            db_path,
            db,
            fetcher: Arc::new(FakeFetcher::default()),
            transcoder: Arc::new(FakeTranscoder::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: 3,
        }
    }

    pub fn scheduler(&self, channels: Vec<Channel>) -> ChannelScheduler {
        self.scheduler_with(channels, SchedulerSettings::default())
    }

    pub fn scheduler_with(
        &self,
        channels: Vec<Channel>,
        settings: SchedulerSettings,
    ) -> ChannelScheduler {
        let transcoders: Vec<Arc<dyn Transcoder>> = (0..self.workers)
            .map(|_| Arc::clone(&self.transcoder) as Arc<dyn Transcoder>)
            .collect();

        ChannelScheduler::new(
            Arc::clone(&self.fetcher) as Arc<dyn ListingFetcher>,
            transcoders,
            self.db.clone(),
            channels,
            settings,
            Arc::clone(&self.shutdown),
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
