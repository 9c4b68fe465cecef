//! Configuration module for the Serene timer.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SERENE_FOCUS_MINUTES` | No | 25 | Focus preset, 1 to 999 minutes |
//! | `SERENE_SHORT_BREAK_MINUTES` | No | 5 | Short break preset |
//! | `SERENE_LONG_BREAK_MINUTES` | No | 15 | Long break preset |
//! | `SERENE_SNAPSHOT_PATH` | No | `<data dir>/timer.json` | Snapshot file |
//! | `SERENE_DATA_DIR` | No | platform data dir | Base of the default snapshot path |

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use crate::types::{Presets, MAX_FOCUS_MINUTES};

/// Name of the snapshot file inside the data directory.
const SNAPSHOT_FILE_NAME: &str = "timer.json";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine a platform data directory.
    #[error("failed to determine data directory")]
    NoDataDirectory,
}

/// Configuration for the timer.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub presets: Presets,

    /// Where the latest snapshot is saved.
    pub snapshot_path: PathBuf,
}

impl TimerConfig {
    /// Creates a new `TimerConfig` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a preset is not a whole number of minutes
    /// in range, or if no snapshot location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Presets::default();
        let presets = Presets {
            focus_minutes: parse_minutes(
                "SERENE_FOCUS_MINUTES",
                defaults.focus_minutes,
                MAX_FOCUS_MINUTES,
            )?,
            short_break_minutes: parse_minutes(
                "SERENE_SHORT_BREAK_MINUTES",
                defaults.short_break_minutes,
                MAX_FOCUS_MINUTES,
            )?,
            long_break_minutes: parse_minutes(
                "SERENE_LONG_BREAK_MINUTES",
                defaults.long_break_minutes,
                MAX_FOCUS_MINUTES,
            )?,
        };

        let snapshot_path = match env::var("SERENE_SNAPSHOT_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => data_dir()?.join(SNAPSHOT_FILE_NAME),
        };

        Ok(Self {
            presets,
            snapshot_path,
        })
    }
}

fn parse_minutes(key: &str, default: u32, max: u32) -> Result<u32, ConfigError> {
    let Ok(val) = env::var(key) else {
        return Ok(default);
    };

    let minutes = val.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected whole minutes, got '{val}'"),
    })?;
    if !(1..=max).contains(&minutes) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be between 1 and {max}, got {minutes}"),
        });
    }
    Ok(minutes)
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    match env::var("SERENE_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => ProjectDirs::from("app", "Serene", "serene")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDirectory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Clears all SERENE_* vars before the test and restores them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("SERENE_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("SERENE_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    #[serial]
    fn test_defaults() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");

            let config = TimerConfig::from_env().expect("should parse defaults");

            assert_eq!(config.presets, Presets::default());
            assert_eq!(config.snapshot_path, PathBuf::from("/tmp/serene-data/timer.json"));
        });
    }

    #[test]
    #[serial]
    fn test_custom_presets_and_path() {
        with_clean_env(|| {
            env::set_var("SERENE_FOCUS_MINUTES", "50");
            env::set_var("SERENE_SHORT_BREAK_MINUTES", "10");
            env::set_var("SERENE_LONG_BREAK_MINUTES", "30");
            env::set_var("SERENE_SNAPSHOT_PATH", "/var/lib/serene/t.json");

            let config = TimerConfig::from_env().expect("should parse custom config");

            assert_eq!(config.presets.focus_minutes, 50);
            assert_eq!(config.presets.short_break_minutes, 10);
            assert_eq!(config.presets.long_break_minutes, 30);
            assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/serene/t.json"));
        });
    }

    #[test]
    #[serial]
    fn test_out_of_range_focus() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_FOCUS_MINUTES", "1000");

            let result = TimerConfig::from_env();

            assert!(matches!(
                result,
                Err(ConfigError::InvalidValue { ref key, .. }) if key == "SERENE_FOCUS_MINUTES"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_zero_break_rejected() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_SHORT_BREAK_MINUTES", "0");

            assert!(TimerConfig::from_env().is_err());
        });
    }

    #[test]
    #[serial]
    fn test_non_numeric_minutes() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_LONG_BREAK_MINUTES", "fifteen");

            let err = TimerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("fifteen"));
        });
    }
}
