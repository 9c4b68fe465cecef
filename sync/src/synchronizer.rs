//! Identity-scoped state synchronizer.
//!
//! The [`Synchronizer`] owns the in-memory [`ApplicationState`] and decides,
//! from identity reports, which backend that state belongs to:
//!
//! ```text
//! report (pending)          ──▶ Unresolved
//! report (resolved, none)   ──▶ Unresolved ──load guest keys──▶ Guest
//! report (resolved, X)      ──▶ Unresolved ──clear guest keys, fetch X──▶ Identity(X)
//! ```
//!
//! Every report starts a new epoch. Loads run on spawned tasks and carry the
//! epoch they were started in; an outcome from an older epoch is discarded,
//! so a slow load for a previous user can never overwrite the current state.
//!
//! Mutations are applied in memory immediately. When the owner is resolved
//! the committed state is queued to the persistence worker, which re-checks
//! the owner before writing.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{
    load_guest_state, ConfiguredRemote, FileLocalStore, LocalStore, RemoteStore,
};
use crate::command::StateCommand;
use crate::config::Config;
use crate::error::{StateError, SyncError};
use crate::owner::{DataOwner, IdentityReport};
use crate::types::{ApplicationState, Task, Theme};
use crate::worker::{spawn_worker, Ownership, PersistJob, WorkerMessage};

/// Result of a load started for one epoch.
#[derive(Debug)]
struct LoadOutcome {
    epoch: u64,
    owner: DataOwner,
    state: ApplicationState,
}

/// Keeps the application state bound to the current data owner.
///
/// Must be created inside a Tokio runtime.
pub struct Synchronizer<L: LocalStore, R: RemoteStore> {
    state: ApplicationState,
    ownership: watch::Sender<Ownership>,
    local: Arc<L>,
    remote: Arc<R>,
    worker_tx: mpsc::UnboundedSender<WorkerMessage>,
    worker: JoinHandle<()>,
    loads_tx: mpsc::UnboundedSender<LoadOutcome>,
    loads_rx: mpsc::UnboundedReceiver<LoadOutcome>,
    /// Set while a load for the current epoch is in flight.
    loading: bool,
}

impl Synchronizer<FileLocalStore, ConfiguredRemote> {
    /// Builds a synchronizer from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the remote client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let local = FileLocalStore::new(&config.data_dir);
        let remote = ConfiguredRemote::from_config(config.remote.as_ref())?;
        info!(data_dir = %config.data_dir.display(), "Guest store ready");
        Ok(Self::new(local, remote))
    }
}

impl<L: LocalStore, R: RemoteStore> Synchronizer<L, R> {
    /// Creates a synchronizer in the unresolved state with default contents.
    pub fn new(local: L, remote: R) -> Self {
        let local = Arc::new(local);
        let remote = Arc::new(remote);
        let (ownership, ownership_rx) = watch::channel(Ownership::default());
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let worker = spawn_worker(Arc::clone(&local), Arc::clone(&remote), ownership_rx, worker_rx);
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();

        Self {
            state: ApplicationState::default(),
            ownership,
            local,
            remote,
            worker_tx,
            worker,
            loads_tx,
            loads_rx,
            loading: false,
        }
    }

    /// Current in-memory state.
    #[must_use]
    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    /// Backend the state currently belongs to.
    #[must_use]
    pub fn owner(&self) -> DataOwner {
        self.ownership.borrow().owner.clone()
    }

    /// Whether the state has been loaded for a resolved owner.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.ownership.borrow().owner.is_resolved()
    }

    /// Handles a report from the identity source.
    ///
    /// The owner becomes [`DataOwner::Unresolved`] until the load for this
    /// report completes; see [`settle`](Self::settle) and
    /// [`poll_loads`](Self::poll_loads).
    pub fn on_identity(&mut self, report: IdentityReport) {
        let live_identity = if report.resolved {
            report.identity.as_ref().map(|identity| identity.id.clone())
        } else {
            None
        };

        let mut epoch = 0;
        self.ownership.send_modify(|ownership| {
            ownership.epoch += 1;
            ownership.owner = DataOwner::Unresolved;
            ownership.live_identity = live_identity;
            epoch = ownership.epoch;
        });

        if !report.resolved {
            debug!(epoch, "Identity pending, persistence disabled");
            self.loading = false;
            return;
        }

        self.loading = true;
        let loads_tx = self.loads_tx.clone();

        match report.identity {
            None => {
                debug!(epoch, "Loading guest state");
                let local = Arc::clone(&self.local);
                let worker_tx = self.worker_tx.clone();
                tokio::spawn(async move {
                    // Queued behind any pending clear so it reads what the clear left.
                    let (reply_tx, reply_rx) = oneshot::channel();
                    let _ = worker_tx.send(WorkerMessage::LoadGuest(reply_tx));
                    let state = match reply_rx.await {
                        Ok(state) => state,
                        Err(_) => {
                            warn!("Persistence worker stopped, reading guest keys directly");
                            load_guest_state(&*local).await
                        }
                    };
                    let _ = loads_tx.send(LoadOutcome {
                        epoch,
                        owner: DataOwner::Guest,
                        state,
                    });
                });
            }
            Some(identity) => {
                debug!(epoch, "Loading remote state");
                let remote = Arc::clone(&self.remote);
                let worker_tx = self.worker_tx.clone();
                tokio::spawn(async move {
                    // Guest data must not survive into the signed-in session.
                    let (ack_tx, ack_rx) = oneshot::channel();
                    if worker_tx
                        .send(WorkerMessage::ClearGuest { epoch, ack: ack_tx })
                        .is_err()
                        || ack_rx.await.is_err()
                    {
                        warn!("Persistence worker stopped, guest keys not cleared");
                    }

                    let state = match remote.get(&identity.id).await {
                        Ok(Some(document)) => document.into_state(),
                        Ok(None) => {
                            debug!("No remote document, seeding defaults");
                            ApplicationState::seeded(identity.display_name.as_deref())
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to load remote state, using defaults");
                            ApplicationState::seeded(identity.display_name.as_deref())
                        }
                    };

                    let _ = loads_tx.send(LoadOutcome {
                        epoch,
                        owner: DataOwner::Identity(identity.id),
                        state,
                    });
                });
            }
        }
    }

    /// Applies every load outcome that has already arrived.
    ///
    /// Returns `true` if the state is loaded afterwards.
    pub fn poll_loads(&mut self) -> bool {
        while let Ok(outcome) = self.loads_rx.try_recv() {
            self.apply_load(outcome);
        }
        self.is_loaded()
    }

    /// Waits until the load for the latest report has been applied.
    ///
    /// Returns immediately while the identity is still pending.
    pub async fn settle(&mut self) -> DataOwner {
        while self.loading {
            match self.loads_rx.recv().await {
                Some(outcome) => self.apply_load(outcome),
                None => break,
            }
        }
        self.owner()
    }

    /// Reports `report` and waits for the resulting load.
    pub async fn resolve(&mut self, report: IdentityReport) -> DataOwner {
        self.on_identity(report);
        self.settle().await
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        let current = self.ownership.borrow().epoch;
        if outcome.epoch != current {
            debug!(
                owner = %outcome.owner,
                epoch = outcome.epoch,
                current,
                "Discarding superseded load"
            );
            return;
        }

        self.state = outcome.state;
        self.loading = false;
        self.ownership.send_modify(|ownership| ownership.owner = outcome.owner);
        info!(owner = %self.owner(), tasks = self.state.tasks.len(), "State loaded");
    }

    /// Applies `command` and persists the result for the current owner.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] if the command is rejected; the state is unchanged.
    pub fn dispatch(&mut self, command: StateCommand) -> Result<(), StateError> {
        self.state = self.state.apply(command)?;
        self.commit();
        Ok(())
    }

    fn commit(&self) {
        let (epoch, owner) = {
            let ownership = self.ownership.borrow();
            if !ownership.permits(ownership.epoch, &ownership.owner) {
                debug!(owner = %ownership.owner, "Owner not resolved, change kept in memory");
                return;
            }
            (ownership.epoch, ownership.owner.clone())
        };

        let job = PersistJob {
            epoch,
            owner,
            state: self.state.clone(),
        };
        if self.worker_tx.send(WorkerMessage::Persist(job)).is_err() {
            warn!("Persistence worker stopped, change not saved");
        }
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StateError> {
        self.dispatch(StateCommand::SetTheme(theme))
    }

    pub fn set_wallpaper_url(&mut self, url: impl Into<String>) -> Result<(), StateError> {
        self.dispatch(StateCommand::SetWallpaperUrl(url.into()))
    }

    pub fn set_background_dim(&mut self, dim: f32) -> Result<(), StateError> {
        self.dispatch(StateCommand::SetBackgroundDim(dim))
    }

    /// Sets the display name to the first whitespace-delimited token of `name`.
    pub fn set_display_name(&mut self, name: impl Into<String>) -> Result<(), StateError> {
        self.dispatch(StateCommand::SetDisplayName(name.into()))
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) -> Result<(), StateError> {
        self.dispatch(StateCommand::SetTasks(tasks))
    }

    /// Creates a task with a palette color and adds it to the top of the list.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EmptyTaskTitle`] for a blank title.
    pub fn add_task(&mut self, title: &str, description: Option<&str>) -> Result<Uuid, StateError> {
        let task = Task::new(title, description)?;
        let id = task.id;
        self.dispatch(StateCommand::AddTask(task))?;
        Ok(id)
    }

    pub fn toggle_task(&mut self, id: Uuid) -> Result<(), StateError> {
        self.dispatch(StateCommand::ToggleTask(id))
    }

    pub fn update_task(
        &mut self,
        id: Uuid,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<(), StateError> {
        self.dispatch(StateCommand::UpdateTask {
            id,
            title: title.into(),
            description,
        })
    }

    pub fn remove_task(&mut self, id: Uuid) -> Result<(), StateError> {
        self.dispatch(StateCommand::RemoveTask(id))
    }

    pub fn move_task(&mut self, id: Uuid, index: usize) -> Result<(), StateError> {
        self.dispatch(StateCommand::MoveTask { id, index })
    }

    /// Waits until every change committed so far has been written or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WorkerStopped`] if the worker is no longer running.
    pub async fn flush(&self) -> Result<(), SyncError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.worker_tx
            .send(WorkerMessage::Flush(ack_tx))
            .map_err(|_| SyncError::WorkerStopped)?;
        ack_rx.await.map_err(|_| SyncError::WorkerStopped)
    }

    /// Flushes pending writes and stops the worker.
    ///
    /// Writes are still subject to the owner check, so a change queued for an
    /// owner that has since been replaced is not written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WorkerStopped`] if the worker had already stopped.
    pub async fn shutdown(self) -> Result<(), SyncError> {
        let result = self.flush().await;
        self.worker.abort();
        info!("Synchronizer stopped");
        result
    }
}
