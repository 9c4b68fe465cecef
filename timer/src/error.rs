//! Error types for the Serene timer.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by [`TimerHandle`](crate::TimerHandle) operations.
#[derive(Error, Debug)]
pub enum TimerError {
    /// The timer task has stopped and no longer accepts commands.
    #[error("timer task is no longer running")]
    ChannelClosed,

    /// Reading or writing a snapshot failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from a [`SnapshotStore`](crate::SnapshotStore).
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot JSON could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for timer operations.
pub type Result<T> = std::result::Result<T, TimerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_closed_display() {
        assert_eq!(
            TimerError::ChannelClosed.to_string(),
            "timer task is no longer running"
        );
    }

    #[test]
    fn snapshot_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TimerError = SnapshotError::from(json_err).into();
        assert!(matches!(err, TimerError::Snapshot(SnapshotError::Json(_))));
        assert!(err.to_string().starts_with("snapshot error: JSON error"));
    }
}
