//! Persistence backends for the application state.
//!
//! Two kinds of store are supported:
//!
//! - [`LocalStore`]: a device-scoped key-value store holding the guest state,
//!   one key per field (see [`GuestKey`]).
//! - [`RemoteStore`]: a document store holding one [`RemoteDocument`] per
//!   authenticated user, written with merge semantics.
//!
//! The helpers in this module translate between [`ApplicationState`] and the
//! stored records. Read helpers never fail: absent or unreadable records fall
//! back to defaults and are logged.

pub mod file;
pub mod http;
pub mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::types::{ApplicationState, Task, Theme};

pub use file::FileLocalStore;
pub use http::HttpRemoteStore;
pub use memory::{MemoryLocalStore, MemoryRemoteStore};

/// Device-scoped key-value store.
pub trait LocalStore: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes `key`. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Identity-scoped document store.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches the document of user `id`, `None` if it does not exist.
    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<RemoteDocument>, StoreError>> + Send;

    /// Merges `document` into the document of user `id`, creating it if needed.
    /// Fields left as `None` are untouched on the server.
    fn put(
        &self,
        id: &str,
        document: &RemoteDocument,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Remote store chosen at startup from configuration.
///
/// Without a configured endpoint, signed-in state is kept in memory for the
/// lifetime of the process.
#[derive(Debug, Clone)]
pub enum ConfiguredRemote {
    Http(HttpRemoteStore),
    Memory(MemoryRemoteStore),
}

impl ConfiguredRemote {
    /// Builds the HTTP store if `config` is set, an in-memory store otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if the HTTP client cannot be created.
    pub fn from_config(config: Option<&crate::config::RemoteConfig>) -> Result<Self, StoreError> {
        match config {
            Some(remote) => Ok(Self::Http(HttpRemoteStore::from_config(remote)?)),
            None => {
                warn!("No remote store configured, signed-in state will not outlive the process");
                Ok(Self::Memory(MemoryRemoteStore::new()))
            }
        }
    }
}

impl RemoteStore for ConfiguredRemote {
    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, StoreError> {
        match self {
            Self::Http(store) => store.get(id).await,
            Self::Memory(store) => store.get(id).await,
        }
    }

    async fn put(&self, id: &str, document: &RemoteDocument) -> Result<(), StoreError> {
        match self {
            Self::Http(store) => store.put(id, document).await,
            Self::Memory(store) => store.put(id, document).await,
        }
    }
}

/// Keys of the guest state in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestKey {
    Theme,
    Wallpaper,
    BackgroundDim,
    DisplayName,
    Tasks,
}

impl GuestKey {
    /// Every guest key, in write order.
    pub const ALL: [Self; 5] = [
        Self::Theme,
        Self::Wallpaper,
        Self::BackgroundDim,
        Self::DisplayName,
        Self::Tasks,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Wallpaper => "wallpaper",
            Self::BackgroundDim => "background-dim",
            Self::DisplayName => "display-name",
            Self::Tasks => "tasks",
        }
    }

    fn encode(self, state: &ApplicationState) -> Result<String, StoreError> {
        Ok(match self {
            Self::Theme => state.theme.as_str().to_string(),
            Self::Wallpaper => state.wallpaper_url.clone(),
            Self::BackgroundDim => state.background_dim.to_string(),
            Self::DisplayName => state.display_name.clone(),
            Self::Tasks => serde_json::to_string(&state.tasks)?,
        })
    }
}

/// One user's document in the remote store.
///
/// Every field is optional so that partially written documents can still be
/// read; missing fields take their default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallpaper_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_dim: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

impl RemoteDocument {
    /// Overlays the fields set in `update` onto this document.
    pub fn merge(&mut self, update: &RemoteDocument) {
        if update.theme.is_some() {
            self.theme = update.theme;
        }
        if update.wallpaper_url.is_some() {
            self.wallpaper_url.clone_from(&update.wallpaper_url);
        }
        if update.background_dim.is_some() {
            self.background_dim = update.background_dim;
        }
        if update.display_name.is_some() {
            self.display_name.clone_from(&update.display_name);
        }
        if update.tasks.is_some() {
            self.tasks.clone_from(&update.tasks);
        }
    }

    /// Converts the document to state, filling missing fields with defaults.
    #[must_use]
    pub fn into_state(self) -> ApplicationState {
        let defaults = ApplicationState::default();
        ApplicationState {
            theme: self.theme.unwrap_or(defaults.theme),
            wallpaper_url: self.wallpaper_url.unwrap_or(defaults.wallpaper_url),
            background_dim: self.background_dim.unwrap_or(defaults.background_dim),
            display_name: self.display_name.unwrap_or(defaults.display_name),
            tasks: self.tasks.unwrap_or(defaults.tasks),
        }
        .sanitized()
    }
}

impl From<&ApplicationState> for RemoteDocument {
    fn from(state: &ApplicationState) -> Self {
        Self {
            theme: Some(state.theme),
            wallpaper_url: Some(state.wallpaper_url.clone()),
            background_dim: Some(state.background_dim),
            display_name: Some(state.display_name.clone()),
            tasks: Some(state.tasks.clone()),
        }
    }
}

/// Reads the guest state from `local`, defaulting every absent or unreadable key.
pub async fn load_guest_state<L: LocalStore>(local: &L) -> ApplicationState {
    let mut state = ApplicationState::default();

    for key in GuestKey::ALL {
        let raw = match local.get(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Failed to read guest key, using default");
                continue;
            }
        };

        match key {
            GuestKey::Theme => match raw.parse() {
                Ok(theme) => state.theme = theme,
                Err(e) => warn!(error = %e, "Ignoring stored theme"),
            },
            GuestKey::Wallpaper => state.wallpaper_url = raw,
            GuestKey::BackgroundDim => match raw.trim().parse::<f32>() {
                Ok(dim) => state.background_dim = dim,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring stored background dim"),
            },
            GuestKey::DisplayName => state.display_name = raw,
            GuestKey::Tasks => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => state.tasks = tasks,
                Err(e) => warn!(error = %e, "Ignoring stored tasks"),
            },
        }
    }

    state.sanitized()
}

/// Writes every guest key of `state` to `local`.
///
/// # Errors
///
/// Returns the first [`StoreError`] encountered; keys after it are not written.
pub async fn write_guest_state<L: LocalStore>(
    local: &L,
    state: &ApplicationState,
) -> Result<(), StoreError> {
    for key in GuestKey::ALL {
        let value = key.encode(state)?;
        local.put(key.as_str(), &value).await?;
    }
    debug!(tasks = state.tasks.len(), "Guest state written");
    Ok(())
}

/// Deletes every guest key from `local`, attempting all keys even if some fail.
///
/// # Errors
///
/// Returns the last [`StoreError`] encountered.
pub async fn clear_guest_state<L: LocalStore>(local: &L) -> Result<(), StoreError> {
    let mut result = Ok(());
    for key in GuestKey::ALL {
        if let Err(e) = local.remove(key.as_str()).await {
            warn!(key = key.as_str(), error = %e, "Failed to clear guest key");
            result = Err(e);
        }
    }
    result
}
