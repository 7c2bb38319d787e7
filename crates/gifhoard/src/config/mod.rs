pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, resolve_config, CONFIG_ENV};
pub use schema::{
    ChannelsConfig, Config, DatabaseConfig, LedgerConfig, LoggingConfig, RetentionConfig,
    SchedulerConfig, SourceConfig, TranscoderConfig, TranscoderKind,
};
