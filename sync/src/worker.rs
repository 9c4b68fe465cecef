//! Background persistence worker.
//!
//! Committed state changes are queued as [`PersistJob`]s and written by a
//! single task, one at a time, in commit order. Before each write the job is
//! checked against the live [`Ownership`]: a job computed under an owner that
//! has since been replaced is dropped instead of written.
//!
//! Consecutive queued jobs are coalesced; only the newest state is written
//! since every job carries the full state.
//!
//! Guest loads and guest-key clears go through the same queue, so a load
//! always observes every clear and write queued before it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::backend::{
    clear_guest_state, load_guest_state, write_guest_state, LocalStore, RemoteDocument, RemoteStore,
};
use crate::owner::DataOwner;
use crate::types::ApplicationState;

/// The synchronizer's current binding, shared with the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Ownership {
    /// Incremented on every identity report.
    pub epoch: u64,
    pub owner: DataOwner,
    /// User id most recently reported by the identity source.
    pub live_identity: Option<String>,
}

impl Ownership {
    /// Whether a write computed in `epoch` for `owner` may proceed now.
    pub fn permits(&self, epoch: u64, owner: &DataOwner) -> bool {
        if epoch != self.epoch || *owner != self.owner {
            return false;
        }
        match owner {
            DataOwner::Unresolved => false,
            DataOwner::Guest => self.live_identity.is_none(),
            DataOwner::Identity(id) => self.live_identity.as_deref() == Some(id.as_str()),
        }
    }
}

/// Full state to be written for one owner.
#[derive(Debug, Clone)]
pub(crate) struct PersistJob {
    pub epoch: u64,
    pub owner: DataOwner,
    pub state: ApplicationState,
}

#[derive(Debug)]
pub(crate) enum WorkerMessage {
    Persist(PersistJob),
    /// Delete the guest keys for the sign-in started in `epoch`,
    /// acknowledging once handled. Skipped once the epoch has moved on.
    ClearGuest { epoch: u64, ack: oneshot::Sender<()> },
    /// Read the guest keys and reply with the stored state.
    LoadGuest(oneshot::Sender<ApplicationState>),
    /// Acknowledge once every earlier message has been handled.
    Flush(oneshot::Sender<()>),
}

pub(crate) fn spawn_worker<L, R>(
    local: Arc<L>,
    remote: Arc<R>,
    ownership: watch::Receiver<Ownership>,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
) -> JoinHandle<()>
where
    L: LocalStore,
    R: RemoteStore,
{
    tokio::spawn(run_worker(local, remote, ownership, rx))
}

async fn run_worker<L, R>(
    local: Arc<L>,
    remote: Arc<R>,
    ownership: watch::Receiver<Ownership>,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
) where
    L: LocalStore,
    R: RemoteStore,
{
    debug!("Starting persistence worker");
    let mut carried: Option<WorkerMessage> = None;

    loop {
        let message = match carried.take() {
            Some(message) => message,
            None => match rx.recv().await {
                Some(message) => message,
                None => break,
            },
        };

        match message {
            WorkerMessage::Persist(mut job) => {
                let mut coalesced = 0usize;
                loop {
                    match rx.try_recv() {
                        Ok(WorkerMessage::Persist(newer)) => {
                            job = newer;
                            coalesced += 1;
                        }
                        Ok(other) => {
                            carried = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                if coalesced > 0 {
                    trace!(coalesced, "Coalesced queued persistence jobs");
                }
                execute(&*local, &*remote, &ownership, job).await;
            }
            WorkerMessage::ClearGuest { epoch, ack } => {
                let current = ownership.borrow().epoch;
                if epoch != current {
                    debug!(epoch, current, "Skipping guest clear for superseded sign-in");
                } else if clear_guest_state(&*local).await.is_ok() {
                    debug!("Cleared guest keys");
                }
                let _ = ack.send(());
            }
            WorkerMessage::LoadGuest(reply) => {
                let _ = reply.send(load_guest_state(&*local).await);
            }
            WorkerMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    debug!("Persistence worker terminated");
}

async fn execute<L, R>(local: &L, remote: &R, ownership: &watch::Receiver<Ownership>, job: PersistJob)
where
    L: LocalStore,
    R: RemoteStore,
{
    let permitted = ownership.borrow().permits(job.epoch, &job.owner);
    if !permitted {
        debug!(owner = %job.owner, epoch = job.epoch, "Dropping write for superseded owner");
        return;
    }

    match &job.owner {
        DataOwner::Guest => {
            if let Err(e) = write_guest_state(local, &job.state).await {
                warn!(error = %e, "Failed to persist guest state");
            }
        }
        DataOwner::Identity(id) => {
            let document = RemoteDocument::from(&job.state);
            match remote.put(id, &document).await {
                Ok(()) => debug!(tasks = job.state.tasks.len(), "Remote state written"),
                Err(e) => warn!(error = %e, "Failed to persist remote state"),
            }
        }
        DataOwner::Unresolved => {}
    }
}
