//! Continuous ingestion: gate, ledger, transcode pool and the channel
//! scheduler that ties them together.

pub mod gate;
pub mod job;
pub mod ledger;
pub mod pool;
pub mod scheduler;

pub use gate::{Action, DropReason, Gate};
pub use job::TranscodeJob;
pub use ledger::{DownloadLedger, RetryPolicy};
pub use pool::{PoolStats, TranscodePool};
pub use scheduler::{ChannelReport, ChannelScheduler, SchedulerSettings, SweepReport};
