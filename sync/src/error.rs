//! Error types for the Serene session synchronizer.
//!
//! Backend failures ([`StoreError`]) are transient: the synchronizer logs and
//! swallows them. Invalid mutation input ([`StateError`]) is returned to the
//! caller and leaves the prior state untouched.

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;

/// Errors raised by local or remote persistence backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with an unexpected status.
    #[error("remote store error: {status} - {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The backend could not be constructed.
    #[error("store configuration error: {0}")]
    Configuration(String),
}

/// Rejected mutation input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Display name has no non-whitespace token.
    #[error("display name cannot be empty")]
    EmptyDisplayName,

    /// Task title is blank.
    #[error("task title cannot be empty")]
    EmptyTaskTitle,

    /// Background dim outside `[0, 1]` or not a number.
    #[error("background dim must be between 0 and 1, got {0}")]
    DimOutOfRange(f32),

    /// Two tasks share an id.
    #[error("duplicate task id {0}")]
    DuplicateTaskId(Uuid),

    /// No task with this id.
    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    /// Reorder target past the end of the list.
    #[error("cannot move task to index {index} in a list of {len}")]
    MoveOutOfBounds { index: usize, len: usize },
}

/// Errors surfaced by the synchronizer API.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid mutation input.
    #[error("invalid mutation: {0}")]
    State(#[from] StateError),

    /// The persistence worker is no longer running.
    #[error("persistence worker stopped")]
    WorkerStopped,
}

/// A specialized `Result` type for synchronizer operations.
pub type Result<T> = std::result::Result<T, SyncError>;
