//! Error types for the scheduler crate.

use thiserror::Error;
use tidemark_core::ConfigError;

/// Errors returned by the backup worker and its collaborators.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job is already live; manual triggers are rejected, not queued.
    #[error("backup already in progress")]
    AlreadyRunning,

    /// Invalid configuration or failure loading/saving it
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The config store failed outside of config parsing
    #[error("config store error: {0}")]
    Store(String),

    /// `destination_path` is empty
    #[error("no backup destination configured")]
    NoDestination,

    /// A name that does not refer to a backup artifact
    #[error("not a backup artifact: {0}")]
    InvalidArtifact(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `SchedulerError`.
pub type Result<T> = std::result::Result<T, SchedulerError>;
