//! Application state types for the Serene start page.
//!
//! This module defines the single [`ApplicationState`] owned by the
//! synchronizer, its [`Task`] list, and the normalisation rules applied to
//! every value that enters the state (display names, background dim, task ids).
//! All types serialize to camelCase JSON.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::error::StateError;
use crate::links::{extract_links, remove_links, Link};

/// Palette new tasks draw their color tag from.
pub const TASK_COLORS: [&str; 6] = [
    "#64B5F6", "#81C784", "#FFD54F", "#FF8A65", "#9575CD", "#F06292",
];

/// Default dim applied over a custom wallpaper.
pub const DEFAULT_BACKGROUND_DIM: f32 = 0.3;

/// Visual theme of the start page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    Custom,
}

impl Theme {
    /// Returns the stored string form of the theme.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored theme string is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown theme '{0}'")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "custom" => Ok(Self::Custom),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, assigned at creation and never reused.
    pub id: Uuid,

    /// Non-empty title.
    pub title: String,

    /// Optional free-form description, may embed links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,

    /// Color tag drawn from [`TASK_COLORS`] at creation.
    pub color: String,
}

impl Task {
    /// Creates a new, uncompleted task with a fresh id and a random palette color.
    ///
    /// The title and description are trimmed; an empty description becomes `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EmptyTaskTitle`] if the title is blank.
    pub fn new(title: &str, description: Option<&str>) -> Result<Self, StateError> {
        let title = normalize_title(title)?;
        let color = TASK_COLORS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(TASK_COLORS[0])
            .to_string();

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description: normalize_description(description),
            completed: false,
            color,
        })
    }

    /// Links embedded in the description.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        self.description
            .as_deref()
            .map(extract_links)
            .unwrap_or_default()
    }

    /// Description text with embedded links stripped.
    #[must_use]
    pub fn plain_description(&self) -> String {
        self.description
            .as_deref()
            .map(remove_links)
            .unwrap_or_default()
    }
}

/// The complete per-identity state of the start page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub theme: Theme,
    pub wallpaper_url: String,
    pub background_dim: f32,
    pub display_name: String,
    pub tasks: Vec<Task>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            wallpaper_url: String::new(),
            background_dim: DEFAULT_BACKGROUND_DIM,
            display_name: String::new(),
            tasks: Vec::new(),
        }
    }
}

impl ApplicationState {
    /// Guest defaults with the display name pre-filled from an identity provider.
    #[must_use]
    pub fn seeded(display_name: Option<&str>) -> Self {
        Self {
            display_name: display_name
                .and_then(first_token)
                .map(str::to_string)
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// The wallpaper to render, only when the custom theme is active.
    #[must_use]
    pub fn effective_wallpaper(&self) -> Option<&str> {
        match self.theme {
            Theme::Custom if !self.wallpaper_url.is_empty() => Some(&self.wallpaper_url),
            _ => None,
        }
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Repairs state read from a backend so that it satisfies the model invariants.
    ///
    /// Out-of-range dims are clamped, display names reduced to their first
    /// token, tasks with blank titles dropped and duplicate ids keep only the
    /// first occurrence.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.background_dim = if self.background_dim.is_finite() {
            self.background_dim.clamp(0.0, 1.0)
        } else {
            DEFAULT_BACKGROUND_DIM
        };
        self.display_name = first_token(&self.display_name)
            .unwrap_or_default()
            .to_string();

        let mut seen = HashSet::new();
        self.tasks.retain(|task| {
            if task.title.trim().is_empty() {
                warn!(task_id = %task.id, "Dropping stored task with empty title");
                return false;
            }
            if !seen.insert(task.id) {
                warn!(task_id = %task.id, "Dropping stored task with duplicate id");
                return false;
            }
            true
        });
        self
    }
}

/// Returns the first whitespace-delimited token of `raw`, if any.
#[must_use]
pub fn first_token(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

/// Normalizes a display name to its first token.
///
/// # Errors
///
/// Returns [`StateError::EmptyDisplayName`] if the input has no token.
pub fn normalize_display_name(raw: &str) -> Result<String, StateError> {
    first_token(raw)
        .map(str::to_string)
        .ok_or(StateError::EmptyDisplayName)
}

pub(crate) fn normalize_title(raw: &str) -> Result<String, StateError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StateError::EmptyTaskTitle);
    }
    Ok(title.to_string())
}

pub(crate) fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
