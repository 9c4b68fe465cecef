//! Serene Timer - drift-correcting pomodoro countdown.
//!
//! The countdown ticks once per second on its own Tokio task and reports
//! progress as [`TimerEvent`]s. Each transition also produces a
//! [`TimerSnapshot`]; restoring a snapshot after the host was suspended
//! subtracts the wall-clock time that passed, so the countdown converges to
//! the correct remaining time regardless of missed ticks.
//!
//! # Modules
//!
//! - [`types`]: Modes, presets, state, snapshots and events
//! - [`countdown`]: Pure countdown state machine
//! - [`actor`]: Timer task and its handle
//! - [`snapshot`]: Snapshot persistence
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod actor;
pub mod config;
pub mod countdown;
pub mod error;
pub mod snapshot;
pub mod types;

pub use actor::{Clock, SystemClock, TimerHandle};
pub use config::{ConfigError, TimerConfig};
pub use countdown::Countdown;
pub use error::{Result, SnapshotError, TimerError};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use types::{
    format_clock, Presets, TimerEvent, TimerMode, TimerSnapshot, TimerState,
    DEFAULT_FOCUS_MINUTES, DEFAULT_LONG_BREAK_MINUTES, DEFAULT_SHORT_BREAK_MINUTES,
    MAX_FOCUS_MINUTES,
};
