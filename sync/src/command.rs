//! Typed mutation commands for [`ApplicationState`].
//!
//! Every change to the state goes through [`ApplicationState::apply`], a pure
//! function returning the next state. Rejected input leaves the caller's
//! state untouched. Nothing here touches a backend.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::StateError;
use crate::types::{
    normalize_description, normalize_display_name, normalize_title, ApplicationState, Task, Theme,
};

/// A single mutation of the application state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateCommand {
    SetTheme(Theme),
    SetWallpaperUrl(String),
    SetBackgroundDim(f32),
    /// Stored as its first whitespace-delimited token.
    SetDisplayName(String),
    /// Replaces the whole task list.
    SetTasks(Vec<Task>),
    /// Inserts a task at the top of the list.
    AddTask(Task),
    ToggleTask(Uuid),
    UpdateTask {
        id: Uuid,
        title: String,
        description: Option<String>,
    },
    RemoveTask(Uuid),
    /// Moves a task to `index` in the resulting list.
    MoveTask { id: Uuid, index: usize },
}

impl ApplicationState {
    /// Applies `command`, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] describing why the input was rejected.
    pub fn apply(&self, command: StateCommand) -> Result<Self, StateError> {
        let mut next = self.clone();

        match command {
            StateCommand::SetTheme(theme) => next.theme = theme,
            StateCommand::SetWallpaperUrl(url) => next.wallpaper_url = url.trim().to_string(),
            StateCommand::SetBackgroundDim(dim) => {
                if !(0.0..=1.0).contains(&dim) {
                    return Err(StateError::DimOutOfRange(dim));
                }
                next.background_dim = dim;
            }
            StateCommand::SetDisplayName(name) => {
                next.display_name = normalize_display_name(&name)?;
            }
            StateCommand::SetTasks(tasks) => {
                validate_tasks(&tasks)?;
                next.tasks = tasks;
            }
            StateCommand::AddTask(task) => {
                validate_task(&task)?;
                if next.task(task.id).is_some() {
                    return Err(StateError::DuplicateTaskId(task.id));
                }
                next.tasks.insert(0, task);
            }
            StateCommand::ToggleTask(id) => {
                let task = find_mut(&mut next.tasks, id)?;
                task.completed = !task.completed;
            }
            StateCommand::UpdateTask {
                id,
                title,
                description,
            } => {
                let title = normalize_title(&title)?;
                let task = find_mut(&mut next.tasks, id)?;
                task.title = title;
                task.description = normalize_description(description.as_deref());
            }
            StateCommand::RemoveTask(id) => {
                let at = position(&next.tasks, id)?;
                next.tasks.remove(at);
            }
            StateCommand::MoveTask { id, index } => {
                let from = position(&next.tasks, id)?;
                if index >= next.tasks.len() {
                    return Err(StateError::MoveOutOfBounds {
                        index,
                        len: next.tasks.len(),
                    });
                }
                let task = next.tasks.remove(from);
                next.tasks.insert(index, task);
            }
        }

        Ok(next)
    }
}

fn validate_task(task: &Task) -> Result<(), StateError> {
    if task.title.trim().is_empty() {
        return Err(StateError::EmptyTaskTitle);
    }
    Ok(())
}

fn validate_tasks(tasks: &[Task]) -> Result<(), StateError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        validate_task(task)?;
        if !seen.insert(task.id) {
            return Err(StateError::DuplicateTaskId(task.id));
        }
    }
    Ok(())
}

fn position(tasks: &[Task], id: Uuid) -> Result<usize, StateError> {
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or(StateError::TaskNotFound(id))
}

fn find_mut(tasks: &mut [Task], id: Uuid) -> Result<&mut Task, StateError> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or(StateError::TaskNotFound(id))
}
