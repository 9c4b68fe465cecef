//! Configuration module for the Serene synchronizer.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SERENE_DATA_DIR` | No | platform data dir | Directory of the guest key-value store |
//! | `SERENE_REMOTE_URL` | No | - | Document store base URL (enables signed-in sync) |
//! | `SERENE_REMOTE_TOKEN` | No | - | Bearer token sent to the document store |
//! | `SERENE_REMOTE_TIMEOUT_SECS` | No | 10 | Request timeout for the document store |
//! | `SERENE_LOG_FORMAT` | No | `pretty` | `pretty` or `json` |
//!
//! # Example
//!
//! ```no_run
//! use serene_sync::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Guest data in: {}", config.data_dir.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use thiserror::Error;

use crate::logging::{LogFormat, UnknownLogFormat};

/// Default request timeout for the remote document store (in seconds).
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

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

/// Configuration for the remote document store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL; documents live under `{base_url}/users/{id}`.
    pub base_url: String,

    /// Optional bearer token.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// Configuration for the synchronizer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the guest key-value store.
    pub data_dir: PathBuf,

    /// Remote document store. If `None`, signed-in state is kept in memory only.
    pub remote: Option<RemoteConfig>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `SERENE_DATA_DIR` is unset and no platform data directory exists
    /// - `SERENE_REMOTE_TIMEOUT_SECS` is not a positive integer
    /// - `SERENE_LOG_FORMAT` is neither `pretty` nor `json`
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: SERENE_DATA_DIR (default: platform data dir)
        let data_dir = match env::var("SERENE_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };

        // Optional: remote store (enabled if SERENE_REMOTE_URL is set)
        let remote = match env::var("SERENE_REMOTE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                let timeout_secs = match env::var("SERENE_REMOTE_TIMEOUT_SECS") {
                    Ok(val) => {
                        let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: "SERENE_REMOTE_TIMEOUT_SECS".to_string(),
                            message: format!("expected positive integer, got '{val}'"),
                        })?;
                        if secs == 0 {
                            return Err(ConfigError::InvalidValue {
                                key: "SERENE_REMOTE_TIMEOUT_SECS".to_string(),
                                message: "timeout must be at least 1 second".to_string(),
                            });
                        }
                        secs
                    }
                    Err(_) => DEFAULT_REMOTE_TIMEOUT_SECS,
                };

                Some(RemoteConfig {
                    base_url: base_url.trim().trim_end_matches('/').to_string(),
                    token: env::var("SERENE_REMOTE_TOKEN")
                        .ok()
                        .filter(|t| !t.is_empty()),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            _ => None,
        };

        let log_format = match env::var("SERENE_LOG_FORMAT") {
            Ok(val) => val.parse().map_err(|e: UnknownLogFormat| ConfigError::InvalidValue {
                key: "SERENE_LOG_FORMAT".to_string(),
                message: e.to_string(),
            })?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            data_dir,
            remote,
            log_format,
        })
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("app", "Serene", "serene")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

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
    fn test_explicit_data_dir_without_remote() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");

            let config = Config::from_env().expect("should parse minimal config");

            assert_eq!(config.data_dir, PathBuf::from("/tmp/serene-data"));
            assert!(config.remote.is_none());
            assert_eq!(config.log_format, LogFormat::Pretty);
        });
    }

    #[test]
    #[serial]
    fn test_remote_with_defaults() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_REMOTE_URL", "https://docs.example.com/v1/");

            let config = Config::from_env().expect("should parse remote config");

            let remote = config.remote.expect("remote should be enabled");
            assert_eq!(remote.base_url, "https://docs.example.com/v1");
            assert!(remote.token.is_none());
            assert_eq!(
                remote.timeout,
                Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS)
            );
        });
    }

    #[test]
    #[serial]
    fn test_full_config() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/srv/serene");
            env::set_var("SERENE_REMOTE_URL", "https://docs.example.com");
            env::set_var("SERENE_REMOTE_TOKEN", "secret");
            env::set_var("SERENE_REMOTE_TIMEOUT_SECS", "3");
            env::set_var("SERENE_LOG_FORMAT", "json");

            let config = Config::from_env().expect("should parse full config");

            let remote = config.remote.expect("remote should be enabled");
            assert_eq!(remote.token.as_deref(), Some("secret"));
            assert_eq!(remote.timeout, Duration::from_secs(3));
            assert_eq!(config.log_format, LogFormat::Json);
        });
    }

    #[test]
    #[serial]
    fn test_zero_timeout_rejected() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_REMOTE_URL", "https://docs.example.com");
            env::set_var("SERENE_REMOTE_TIMEOUT_SECS", "0");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, ref message }
                    if key == "SERENE_REMOTE_TIMEOUT_SECS" && message.contains("at least 1 second")
            ));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_rejected() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_REMOTE_URL", "https://docs.example.com");
            env::set_var("SERENE_REMOTE_TIMEOUT_SECS", "soon");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "SERENE_REMOTE_TIMEOUT_SECS"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_log_format_rejected() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_LOG_FORMAT", "xml");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "SERENE_LOG_FORMAT"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_blank_remote_url_disables_remote() {
        with_clean_env(|| {
            env::set_var("SERENE_DATA_DIR", "/tmp/serene-data");
            env::set_var("SERENE_REMOTE_URL", "  ");

            let config = Config::from_env().expect("should parse config");
            assert!(config.remote.is_none());
        });
    }
}
