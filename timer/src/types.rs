//! Timer model: modes, presets, state, snapshots and events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default focus preset, in minutes.
pub const DEFAULT_FOCUS_MINUTES: u32 = 25;

/// Default short break preset, in minutes.
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;

/// Default long break preset, in minutes.
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;

/// Upper bound of a customized focus preset, in minutes.
pub const MAX_FOCUS_MINUTES: u32 = 999;

/// Preset category the countdown belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "shortBreak",
            Self::LongBreak => "longBreak",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durations of each mode, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presets {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
        }
    }
}

impl Presets {
    /// Replaces the focus preset, clamped to `1..=999` minutes.
    #[must_use]
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes.clamp(1, MAX_FOCUS_MINUTES);
        self
    }

    /// Length of `mode` in seconds.
    #[must_use]
    pub fn seconds(&self, mode: TimerMode) -> u64 {
        let minutes = match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        };
        u64::from(minutes) * 60
    }
}

/// Observable state of the countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub mode: TimerMode,
    pub running: bool,
    /// When the last snapshot was emitted.
    pub last_persisted_at: DateTime<Utc>,
}

/// Persisted form of the countdown, used to re-attach after suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub remaining_seconds: u64,
    pub mode: TimerMode,
    pub running: bool,
    pub persisted_at: DateTime<Utc>,
}

/// Notifications emitted by the timer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Remaining time changed.
    Tick { remaining_seconds: u64 },
    /// The countdown reached zero.
    Completed { mode: TimerMode },
    /// State worth persisting; save it to restore later.
    Snapshot(TimerSnapshot),
}

/// Formats seconds as `MM:SS`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
