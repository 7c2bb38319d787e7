//! Sweep loop over every configured channel.
//!
//! Each sweep shuffles both sensitivity classes, then drives each channel's
//! pager to exhaustion, routing items through the gate and handing new ones
//! to a transcode pool owned by that channel. The pool is closed before the
//! next channel starts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::db::{gif_repo, Database};
use crate::error::{Result, WorkerError};
use crate::ingest::gate::{Action, Gate};
use crate::ingest::job::TranscodeJob;
use crate::ingest::ledger::{DownloadLedger, RetryPolicy};
use crate::ingest::pool::{PoolStats, TranscodePool};
use crate::source::{Channel, ChannelPager, ListingFetcher};
use crate::transcode::Transcoder;

/// Granularity of the cancellable pause between sweeps.
const PAUSE_TICK: Duration = Duration::from_millis(100);

/// Tunables for the sweep loop.
#[derive(Debug, Clone, Default)]
pub struct SchedulerSettings {
    pub pause_between_sweeps: Duration,
    /// Run a single sweep and return.
    pub one_shot: bool,
    pub retry_policy: RetryPolicy,
    /// Records older than this are pruned at the start of each sweep.
    pub max_age: Option<chrono::Duration>,
    /// Fixed base for the per-sweep shuffle seed. The wall clock is used
    /// when unset.
    pub shuffle_seed: Option<u64>,
}

/// Counters for one channel within a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelReport {
    pub pages: u64,
    pub seen: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub patched: u64,
    pub queued: u64,
    pub gate_errors: u64,
    pub pool: PoolStats,
}

/// Summary of one full pass over all channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub channels_ok: u64,
    pub channels_failed: u64,
    pub pruned: u64,
    pub seen: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub patched: u64,
    pub queued: u64,
    pub pool: PoolStats,
}

impl SweepReport {
    fn absorb(&mut self, channel: &ChannelReport) {
        self.seen += channel.seen;
        self.dropped += channel.dropped;
        self.skipped += channel.skipped;
        self.patched += channel.patched;
        self.queued += channel.queued;
        self.pool += channel.pool;
    }
}

/// Drives sweeps until the shutdown flag is raised.
#[derive(Clone)]
pub struct ChannelScheduler {
    fetcher: Arc<dyn ListingFetcher>,
    transcoders: Vec<Arc<dyn Transcoder>>,
    db: Database,
    sfw: Vec<Channel>,
    nsfw: Vec<Channel>,
    settings: SchedulerSettings,
    shutdown: Arc<AtomicBool>,
    sweeps: Arc<AtomicU64>,
}

impl ChannelScheduler {
    /// `channels` may mix both classes; they are split by sensitivity.
    pub fn new(
        fetcher: Arc<dyn ListingFetcher>,
        transcoders: Vec<Arc<dyn Transcoder>>,
        db: Database,
        channels: Vec<Channel>,
        settings: SchedulerSettings,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let (nsfw, sfw): (Vec<Channel>, Vec<Channel>) = channels
            .into_iter()
            .partition(|c| c.sensitivity.is_nsfw());
        Self {
            fetcher,
            transcoders,
            db,
            sfw,
            nsfw,
            settings,
            shutdown,
            sweeps: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts the sweep loop on a dedicated thread with its own runtime.
    pub fn start(&self) -> std::result::Result<JoinHandle<()>, WorkerError> {
        let scheduler = self.clone();
        std::thread::Builder::new()
            .name("channel-scheduler".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to build scheduler runtime: {}", e);
                        return;
                    }
                };
                rt.block_on(scheduler.run());
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))
    }

    /// Signals the loop to stop at its next check.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn is_stopping(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Back-to-back sweeps until stopped, or exactly one in one-shot mode.
    pub async fn run(&self) {
        let mut sweep: u64 = 0;
        while !self.is_stopping() {
            sweep += 1;
            if let Err(e) = self.db.ping() {
                error!("Store unavailable before sweep {}: {}", sweep, e);
            }

            let report = self
                .run_sweep()
                .instrument(info_span!("sweep", number = sweep))
                .await;
            info!(
                sweep,
                channels_ok = report.channels_ok,
                channels_failed = report.channels_failed,
                seen = report.seen,
                patched = report.patched,
                queued = report.queued,
                stored = report.pool.stored,
                failed = report.pool.failed,
                skipped_negative = report.pool.skipped_negative,
                pruned = report.pruned,
                "Sweep finished"
            );

            if self.settings.one_shot {
                break;
            }
            self.pause().await;
        }
        info!("Channel scheduler stopped");
    }

    async fn pause(&self) {
        let mut remaining = self.settings.pause_between_sweeps;
        while !remaining.is_zero() && !self.is_stopping() {
            let tick = remaining.min(PAUSE_TICK);
            tokio::time::sleep(tick).await;
            remaining -= tick;
        }
    }

    /// One pass over every channel: sfw first, then nsfw, each class in a
    /// fresh random order.
    pub async fn run_sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let cutoff = self.settings.max_age.map(|max_age| Utc::now() - max_age);
        if let Some(cutoff) = cutoff {
            match gif_repo::prune_older_than(&self.db, cutoff) {
                Ok(n) => report.pruned = n,
                Err(e) => error!("Pruning failed: {}", e),
            }
        }

        let mut rng = StdRng::seed_from_u64(self.next_seed());
        let mut sfw = self.sfw.clone();
        let mut nsfw = self.nsfw.clone();
        sfw.shuffle(&mut rng);
        nsfw.shuffle(&mut rng);

        for channel in sfw.iter().chain(nsfw.iter()) {
            if self.is_stopping() {
                break;
            }

            let span = info_span!("channel", name = %channel.name, class = %channel.sensitivity);
            let (channel_report, outcome) =
                self.run_channel(channel, cutoff).instrument(span).await;
            report.absorb(&channel_report);

            match outcome {
                Ok(()) => {
                    report.channels_ok += 1;
                    debug!(channel = %channel.name, ?channel_report, "Channel done");
                }
                Err(e) => {
                    report.channels_failed += 1;
                    warn!("Channel /r/{} aborted: {}", channel.name, e);
                }
            }
        }

        report
    }

    /// Seed for this sweep's shuffle; each sweep gets a different one.
    fn next_seed(&self) -> u64 {
        let sweep = self.sweeps.fetch_add(1, Ordering::Relaxed);
        match self.settings.shuffle_seed {
            Some(base) => base.wrapping_add(sweep),
            None => clock_seed(),
        }
    }

    /// Runs one channel. The report covers whatever was processed even
    /// when the channel ends in an error.
    async fn run_channel(
        &self,
        channel: &Channel,
        cutoff: Option<DateTime<Utc>>,
    ) -> (ChannelReport, Result<()>) {
        let mut report = ChannelReport::default();

        let ledger = DownloadLedger::new(self.db.clone(), self.settings.retry_policy);
        let pool = match TranscodePool::new(
            self.transcoders.clone(),
            self.db.clone(),
            ledger,
            Arc::clone(&self.shutdown),
        ) {
            Ok(pool) => pool,
            Err(e) => return (report, Err(e.into())),
        };

        info!("Downloading /r/{}", channel.name);
        let gate = Gate::new(self.db.clone()).with_cutoff(cutoff);
        let outcome = self.drive_channel(channel, &gate, &pool, &mut report).await;
        report.pool = pool.close();
        (report, outcome)
    }

    async fn drive_channel(
        &self,
        channel: &Channel,
        gate: &Gate,
        pool: &TranscodePool,
        report: &mut ChannelReport,
    ) -> Result<()> {
        let mut pager = ChannelPager::new(Arc::clone(&self.fetcher), channel.clone());

        while !self.is_stopping() {
            let page = pager.next_page().await?;
            report.pages += 1;

            for item in &page.items {
                if self.is_stopping() {
                    return Ok(());
                }
                report.seen += 1;

                match gate.reconcile(item, channel) {
                    Ok(Action::Insert(gif)) => match pool.submit(TranscodeJob::new(&channel.name, gif)) {
                        Ok(()) => report.queued += 1,
                        Err(WorkerError::ShuttingDown) => return Ok(()),
                        Err(e) => return Err(e.into()),
                    },
                    Ok(Action::Patch(_)) => report.patched += 1,
                    Ok(Action::Skip(_)) => report.skipped += 1,
                    Ok(Action::Dropped(_)) => report.dropped += 1,
                    Err(e) => {
                        report.gate_errors += 1;
                        error!("Existence check failed for {}: {}", item.media.url, e);
                    }
                }
            }

            if page.exhausted {
                break;
            }
        }

        Ok(())
    }
}

/// RNG seed taken from the wall clock.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
