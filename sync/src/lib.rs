//! Serene Sync - identity-scoped persistence of workspace state.
//!
//! This crate keeps a single in-memory [`ApplicationState`] (theme, wallpaper,
//! background dim, display name and task list) and persists it to exactly one
//! backend at a time: a device-local guest store while nobody is signed in, or
//! a per-user remote document once an identity is known.
//!
//! # Ownership
//!
//! The [`Synchronizer`] tracks a [`DataOwner`]. State computed for one owner
//! is never written to another: identity changes start a new epoch, loads from
//! earlier epochs are discarded, and every write is checked against the live
//! owner both when it is queued and when it executes.
//!
//! # Modules
//!
//! - [`types`]: State model, tasks and themes
//! - [`command`]: State mutations and their validation
//! - [`links`]: Link extraction from task descriptions
//! - [`owner`]: Identity reports and data ownership
//! - [`backend`]: Local and remote stores
//! - [`synchronizer`]: Owner state machine and persistence pipeline
//! - [`config`]: Configuration from environment variables
//! - [`logging`]: Tracing subscriber setup
//! - [`error`]: Error types

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod links;
pub mod logging;
pub mod owner;
pub mod synchronizer;
pub mod types;

mod worker;

pub use backend::{
    ConfiguredRemote, FileLocalStore, HttpRemoteStore, LocalStore, MemoryLocalStore,
    MemoryRemoteStore, RemoteDocument, RemoteStore,
};
pub use command::StateCommand;
pub use config::{Config, ConfigError, RemoteConfig};
pub use error::{Result, StateError, StoreError, SyncError};
pub use links::{extract_links, remove_links, Link};
pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use owner::{DataOwner, Identity, IdentityReport};
pub use synchronizer::Synchronizer;
pub use types::{ApplicationState, Task, Theme};
