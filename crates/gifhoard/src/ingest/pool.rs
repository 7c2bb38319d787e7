use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, error, info, warn};
use tokio::runtime::Runtime;

use crate::db::{gif_repo, Database, InsertOutcome};
use crate::error::WorkerError;
use crate::ingest::job::TranscodeJob;
use crate::ingest::ledger::DownloadLedger;
use crate::transcode::Transcoder;

/// How long a blocked enqueue or dequeue waits before re-checking shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome counts for the jobs a pool accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// New records written.
    pub stored: u64,
    /// Skipped because the ledger holds a failed attempt.
    pub skipped_negative: u64,
    /// Transcoder calls that failed.
    pub failed: u64,
    /// Transcoded, but another writer stored the record first.
    pub duplicate: u64,
    /// Jobs abandoned on a store error.
    pub errors: u64,
}

impl PoolStats {
    /// Total number of jobs accounted for.
    pub fn processed(&self) -> u64 {
        self.stored + self.skipped_negative + self.failed + self.duplicate + self.errors
    }
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.stored += other.stored;
        self.skipped_negative += other.skipped_negative;
        self.failed += other.failed;
        self.duplicate += other.duplicate;
        self.errors += other.errors;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Stored,
    SkippedNegative,
    Failed,
    Duplicate,
    Error,
}

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    skipped_negative: AtomicU64,
    failed: AtomicU64,
    duplicate: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn count(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Stored => &self.stored,
            JobOutcome::SkippedNegative => &self.skipped_negative,
            JobOutcome::Failed => &self.failed,
            JobOutcome::Duplicate => &self.duplicate,
            JobOutcome::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            stored: self.stored.load(Ordering::Relaxed),
            skipped_negative: self.skipped_negative.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Everything a worker needs besides its queue.
struct WorkerContext {
    worker_id: usize,
    transcoder: Arc<dyn Transcoder>,
    runtime: Runtime,
    db: Database,
    ledger: DownloadLedger,
    counters: Arc<Counters>,
}

/// Fixed set of transcode workers draining one rendezvous queue.
///
/// Each worker is bound to one transcoder instance and drives it on its own
/// current-thread runtime.
pub struct TranscodePool {
    job_sender: Sender<TranscodeJob>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    shutdown: Arc<AtomicBool>,
}

impl TranscodePool {
    /// Starts one worker per transcoder instance.
    pub fn new(
        instances: Vec<Arc<dyn Transcoder>>,
        db: Database,
        ledger: DownloadLedger,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        if instances.is_empty() {
            return Err(WorkerError::SpawnFailed(
                "no transcoder instances configured".to_string(),
            ));
        }

        let (job_sender, job_receiver) = bounded::<TranscodeJob>(0);
        let counters = Arc::new(Counters::default());
        let mut workers = Vec::with_capacity(instances.len());

        for (worker_id, transcoder) in instances.into_iter().enumerate() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| WorkerError::SpawnFailed(format!("runtime: {}", e)))?;

            let ctx = WorkerContext {
                worker_id,
                transcoder,
                runtime,
                db: db.clone(),
                ledger: ledger.clone(),
                counters: Arc::clone(&counters),
            };
            let job_rx = job_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);

            let handle = thread::Builder::new()
                .name(format!("transcode-{}", worker_id))
                .spawn(move || run_worker(ctx, job_rx, shutdown_flag))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        debug!("Started {} transcode workers", workers.len());

        Ok(Self {
            job_sender,
            workers,
            counters,
            shutdown,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Hands a job to the next free worker, blocking until one takes it.
    ///
    /// Returns `ShuttingDown` if the shutdown flag is raised while waiting,
    /// including when the workers exit on it mid-wait. The job is then not
    /// accepted.
    pub fn submit(&self, job: TranscodeJob) -> Result<(), WorkerError> {
        let mut job = job;
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(WorkerError::ShuttingDown);
            }

            match self.job_sender.send_timeout(job, POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => job = returned,
                Err(SendTimeoutError::Disconnected(_)) => {
                    if self.shutdown.load(Ordering::Acquire) {
                        return Err(WorkerError::ShuttingDown);
                    }
                    return Err(WorkerError::ChannelClosed);
                }
            }
        }
    }

    /// Closes the queue and waits for every worker to finish its last job.
    pub fn close(self) -> PoolStats {
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Transcode worker {} panicked: {:?}", i, e);
            }
        }

        let stats = self.counters.snapshot();
        debug!("Transcode pool closed: {:?}", stats);
        stats
    }
}

fn run_worker(ctx: WorkerContext, job_receiver: Receiver<TranscodeJob>, shutdown: Arc<AtomicBool>) {
    debug!(
        "Transcode worker {} started on {}",
        ctx.worker_id,
        ctx.transcoder.name()
    );

    loop {
        if shutdown.load(Ordering::Acquire) {
            debug!("Transcode worker {} received shutdown signal", ctx.worker_id);
            break;
        }

        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(job) => {
                let outcome = process_job(&ctx, job);
                ctx.counters.count(outcome);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Transcode worker {} stopped", ctx.worker_id);
}

fn process_job(ctx: &WorkerContext, job: TranscodeJob) -> JobOutcome {
    let _span = tracing::info_span!(
        "transcode",
        worker = ctx.worker_id,
        channel = %job.channel,
        url = %job.url()
    )
    .entered();

    let url = job.url().to_string();

    match ctx.ledger.should_attempt(&url, Utc::now()) {
        Ok(true) => {}
        Ok(false) => return JobOutcome::SkippedNegative,
        Err(e) => {
            error!("Ledger lookup failed for {}: {}", url, e);
            return JobOutcome::Error;
        }
    }

    info!("Transcoding {} on {}", url, ctx.transcoder.name());
    let result = ctx.runtime.block_on(ctx.transcoder.transcode(&url));

    if let Err(e) = ctx.ledger.record(&url, result.is_ok(), Utc::now()) {
        error!("Failed to record download result for {}: {}", url, e);
        if result.is_ok() {
            return JobOutcome::Error;
        }
    }

    let media = match result {
        Ok(media) => media,
        Err(e) => {
            warn!("Transcode of {} failed: {}", url, e);
            return JobOutcome::Failed;
        }
    };

    match gif_repo::insert_if_absent(&ctx.db, &job.into_record(media)) {
        Ok(InsertOutcome::Inserted(id)) => {
            debug!("Stored {} as gif {}", url, id);
            JobOutcome::Stored
        }
        Ok(InsertOutcome::AlreadyStored(id)) => {
            debug!("{} was already stored as gif {}", url, id);
            JobOutcome::Duplicate
        }
        Err(e) => {
            error!("Failed to store {}: {}", url, e);
            JobOutcome::Error
        }
    }
}
