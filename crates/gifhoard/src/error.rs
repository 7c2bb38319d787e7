use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GifhoardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("Transcode error: {0}")]
    Transcode(#[from] crate::transcode::TranscodeError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid channel '{name}': {reason}")]
    InvalidChannel { name: String, reason: String },

    #[error("Invalid transcoder instance '{host}': {reason}")]
    InvalidInstance { host: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Pool is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, GifhoardError>;
