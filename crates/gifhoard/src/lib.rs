pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod slug;
pub mod source;
pub mod telemetry;
pub mod transcode;

pub use config::Config;
pub use db::Database;
pub use error::{ConfigError, GifhoardError, Result, WorkerError};
pub use ingest::{ChannelScheduler, SchedulerSettings, SweepReport};
pub use normalize::{normalize, Normalized};

use std::sync::Arc;

use config::TranscoderKind;
use source::RedditClient;
use transcode::{GfycatTranscoder, GifsTranscoder, Transcoder};

/// Builds one transcoder per configured instance.
pub fn build_transcoders(config: &Config) -> Result<Vec<Arc<dyn Transcoder>>> {
    let timeout = config.transcoder.request_timeout();
    let mut transcoders: Vec<Arc<dyn Transcoder>> = Vec::with_capacity(config.transcoder.instances.len());

    for host in &config.transcoder.instances {
        let transcoder: Arc<dyn Transcoder> = match config.transcoder.kind {
            TranscoderKind::Gifs => Arc::new(GifsTranscoder::new(host, timeout)?),
            TranscoderKind::Gfycat => Arc::new(GfycatTranscoder::new(
                host,
                &config.transcoder.gfycat_api_base,
                timeout,
            )?),
        };
        transcoders.push(transcoder);
    }

    Ok(transcoders)
}

/// Wires the scheduler from configuration and an opened store.
pub fn build_scheduler(
    config: &Config,
    db: Database,
    shutdown: Arc<std::sync::atomic::AtomicBool>,
) -> Result<ChannelScheduler> {
    let fetcher = RedditClient::new(
        &config.source.base_url,
        &config.source.user_agent,
        config.source.request_timeout(),
    )?;

    Ok(ChannelScheduler::new(
        Arc::new(fetcher),
        build_transcoders(config)?,
        db,
        config.channels(),
        config.scheduler_settings(),
        shutdown,
    ))
}
