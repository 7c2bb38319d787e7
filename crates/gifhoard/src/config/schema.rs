use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ingest::{RetryPolicy, SchedulerSettings};
use crate::source::{Channel, Sensitivity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub channels: ChannelsConfig,
    pub transcoder: TranscoderConfig,
    pub scheduler: SchedulerConfig,
    pub ledger: LedgerConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// All channels, sfw first, in configured order.
    pub fn channels(&self) -> Vec<Channel> {
        let sfw = self
            .channels
            .sfw
            .iter()
            .map(|name| Channel::new(name.as_str(), Sensitivity::Sfw));
        let nsfw = self
            .channels
            .nsfw
            .iter()
            .map(|name| Channel::new(name.as_str(), Sensitivity::Nsfw));
        sfw.chain(nsfw).collect()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            pause_between_sweeps: Duration::from_secs(self.scheduler.pause_between_sweeps_secs),
            one_shot: self.scheduler.one_shot,
            retry_policy: RetryPolicy::from_days(self.ledger.retry_failed_after_days),
            max_age: self
                .retention
                .max_age_days
                .map(|d| chrono::Duration::days(i64::from(d))),
            shuffle_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("gifhoard.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_source_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.reddit.com".to_string()
}

fn default_user_agent() -> String {
    format!("gifhoard/{}", env!("CARGO_PKG_VERSION"))
}

fn default_source_timeout() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_source_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_sfw_channels")]
    pub sfw: Vec<String>,
    #[serde(default = "default_nsfw_channels")]
    pub nsfw: Vec<String>,
}

fn default_sfw_channels() -> Vec<String> {
    [
        "gifs",
        "perfectloops",
        "noisygifs",
        "analogygifs",
        "reversegif",
        "aww_gifs",
        "SlyGifs",
        "AnimalsBeingJerks",
        "shittyreactiongifs",
        "CatGifs",
        "Puggifs",
        "SpaceGifs",
        "physicsgifs",
        "educationalgifs",
        "shockwaveporn",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_nsfw_channels() -> Vec<String> {
    [
        "gifsgonewild",
        "porn_gifs",
        "PornGifs",
        "NSFW_SEXY_GIF",
        "adultgifs",
        "NSFW_GIF",
        "nsfw_gifs",
        "porngif",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            sfw: default_sfw_channels(),
            nsfw: default_nsfw_channels(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscoderKind {
    #[default]
    Gifs,
    Gfycat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscoderConfig {
    #[serde(default)]
    pub kind: TranscoderKind,
    /// One worker is started per instance.
    #[serde(default = "default_instances")]
    pub instances: Vec<String>,
    #[serde(default = "default_gfycat_api_base")]
    pub gfycat_api_base: String,
    #[serde(default = "default_transcode_timeout")]
    pub request_timeout_secs: u64,
}

fn default_instances() -> Vec<String> {
    (1..=5).map(|n| format!("http://localhost:808{}", n)).collect()
}

fn default_gfycat_api_base() -> String {
    "http://gfycat.com".to_string()
}

fn default_transcode_timeout() -> u64 {
    120
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            kind: TranscoderKind::default(),
            instances: default_instances(),
            gfycat_api_base: default_gfycat_api_base(),
            request_timeout_secs: default_transcode_timeout(),
        }
    }
}

impl TranscoderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub pause_between_sweeps_secs: u64,
    #[serde(default)]
    pub one_shot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// `None` keeps failed URLs out for good.
    #[serde(default)]
    pub retry_failed_after_days: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
