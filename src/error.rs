//! Error types for fleetsync operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while synchronizing datasets.
///
/// None of these escape the downloader's cycle boundaries; they are logged,
/// counted in the stats snapshot, and retried on the next poll cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or HTTP failure fetching the catalog or a payload
    #[error("transport error: {0}")]
    Transport(String),

    /// Catalog body could not be parsed as a list of entries
    #[error("catalog format error: {0}")]
    Format(String),

    /// Downloaded payload does not match the server-declared checksum
    #[error("md5 checksum mismatch, expected [{expected}], actual [{actual}]")]
    ChecksumMismatch { expected: String, actual: String },

    /// Create/flush/refresh/delete failure against the chunk store
    #[error("chunk store write failed: {0}")]
    StorageWrite(String),

    /// Durable checkpoint write failure
    #[error("checkpoint persist failed: {0}")]
    CheckpointPersist(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Format(e.to_string())
    }
}
