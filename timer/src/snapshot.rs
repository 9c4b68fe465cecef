//! Snapshot persistence.
//!
//! Hosts save the latest [`TimerSnapshot`] from the event stream and hand it
//! back through [`TimerHandle::restore_from`](crate::TimerHandle::restore_from)
//! after a restart or resume.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::SnapshotError;
use crate::types::TimerSnapshot;

/// Storage for the most recent timer snapshot.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Returns the saved snapshot, `None` if nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<Option<TimerSnapshot>, SnapshotError>> + Send;

    /// Replaces the saved snapshot.
    fn save(
        &self,
        snapshot: &TimerSnapshot,
    ) -> impl Future<Output = Result<(), SnapshotError>> + Send;
}

/// Snapshot kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<TimerSnapshot>, SnapshotError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No timer snapshot saved");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, snapshot: &TimerSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        trace!(path = %self.path.display(), "Saved timer snapshot");
        Ok(())
    }
}

/// Snapshot kept in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<TimerSnapshot>>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<TimerSnapshot>, SnapshotError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, snapshot: &TimerSnapshot) -> Result<(), SnapshotError> {
        *self.slot.lock().await = Some(snapshot.clone());
        Ok(())
    }
}
