//! Integration tests for identity-scoped synchronization.
//!
//! These tests drive the synchronizer through identity changes and verify
//! that state is only ever read from and written to the current owner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serene_sync::backend::GuestKey;
use serene_sync::{
    ApplicationState, Config, DataOwner, Identity, IdentityReport, LocalStore, LogFormat,
    MemoryLocalStore, MemoryRemoteStore, RemoteDocument, RemoteStore, StateError, StoreError,
    Synchronizer, Task, Theme,
};
use tempfile::TempDir;
use tokio_test::assert_ok;

// =============================================================================
// Test Helpers
// =============================================================================

/// Remote store that records writes and can delay or fail reads.
#[derive(Clone, Default)]
struct RecordingRemote {
    inner: MemoryRemoteStore,
    writes: Arc<Mutex<Vec<String>>>,
    read_delays: Arc<Mutex<HashMap<String, Duration>>>,
    fail_reads: Arc<AtomicBool>,
}

impl RecordingRemote {
    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn delay_reads(&self, id: &str, delay: Duration) {
        self.read_delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
    }

    async fn seed(&self, id: &str, state: &ApplicationState) {
        self.inner.insert(id, RemoteDocument::from(state)).await;
    }

    async fn document(&self, id: &str) -> Option<RemoteDocument> {
        self.inner.get(id).await.unwrap()
    }
}

impl RemoteStore for RecordingRemote {
    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, StoreError> {
        let delay = self.read_delays.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.inner.get(id).await
    }

    async fn put(&self, id: &str, document: &RemoteDocument) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(id.to_string());
        self.inner.put(id, document).await
    }
}

fn signed_in(id: &str) -> IdentityReport {
    IdentityReport::signed_in(Identity::new(id))
}

fn named_state(name: &str, task: &str) -> ApplicationState {
    ApplicationState {
        display_name: name.to_string(),
        tasks: vec![Task::new(task, None).unwrap()],
        ..ApplicationState::default()
    }
}

fn synchronizer() -> (
    Synchronizer<MemoryLocalStore, RecordingRemote>,
    MemoryLocalStore,
    RecordingRemote,
) {
    let local = MemoryLocalStore::new();
    let remote = RecordingRemote::default();
    let sync = Synchronizer::new(local.clone(), remote.clone());
    (sync, local, remote)
}

// =============================================================================
// Guest Tests
// =============================================================================

#[tokio::test]
async fn test_guest_state_survives_restart() {
    let (mut sync, local, remote) = synchronizer();
    assert_eq!(sync.resolve(IdentityReport::guest()).await, DataOwner::Guest);

    sync.set_display_name("Ada Lovelace").unwrap();
    sync.set_theme(Theme::Custom).unwrap();
    sync.set_wallpaper_url("https://img.example/sea.jpg").unwrap();
    sync.add_task("write notes", Some("see example.com")).unwrap();
    assert_ok!(sync.shutdown().await);

    let mut restarted = Synchronizer::new(local.clone(), remote.clone());
    restarted.resolve(IdentityReport::guest()).await;
    let state = restarted.state();
    assert_eq!(state.display_name, "Ada");
    assert_eq!(state.theme, Theme::Custom);
    assert_eq!(state.effective_wallpaper(), Some("https://img.example/sea.jpg"));
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].title, "write notes");
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn test_first_token_display_name_reaches_store() {
    let (mut sync, local, _remote) = synchronizer();
    sync.resolve(IdentityReport::guest()).await;

    sync.set_display_name("  Ada   Lovelace ").unwrap();
    sync.flush().await.unwrap();

    assert_eq!(sync.state().display_name, "Ada");
    assert_eq!(
        local.get(GuestKey::DisplayName.as_str()).await.unwrap().as_deref(),
        Some("Ada")
    );
}

#[tokio::test]
async fn test_rejected_command_leaves_state_unchanged() {
    let (mut sync, _local, _remote) = synchronizer();
    sync.resolve(IdentityReport::guest()).await;
    sync.set_display_name("Grace").unwrap();

    assert_eq!(
        sync.set_display_name("   "),
        Err(StateError::EmptyDisplayName)
    );
    assert_eq!(sync.state().display_name, "Grace");
    assert!(sync.set_background_dim(1.5).is_err());
    assert!(sync.add_task("  ", None).is_err());
    assert!(sync.state().tasks.is_empty());
}

// =============================================================================
// Ownership Tests
// =============================================================================

#[tokio::test]
async fn test_pending_identity_never_persists() {
    let (mut sync, local, remote) = synchronizer();
    sync.on_identity(IdentityReport::pending());

    sync.set_theme(Theme::Light).unwrap();
    sync.add_task("held in memory", None).unwrap();
    sync.flush().await.unwrap();

    assert!(!sync.is_loaded());
    assert_eq!(sync.owner(), DataOwner::Unresolved);
    assert_eq!(sync.state().theme, Theme::Light);
    assert!(local.is_empty().await);
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn test_mutation_before_load_is_not_written() {
    let (mut sync, _local, remote) = synchronizer();
    remote.seed("alice", &named_state("Alice", "alice task")).await;

    sync.on_identity(signed_in("alice"));
    sync.set_display_name("Mallory").unwrap();
    sync.settle().await;
    sync.flush().await.unwrap();

    assert_eq!(sync.state().display_name, "Alice");
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn test_sign_in_clears_guest_keys_and_writes_remote_only() {
    let (mut sync, local, remote) = synchronizer();
    sync.resolve(IdentityReport::guest()).await;
    sync.add_task("guest task", None).unwrap();
    sync.flush().await.unwrap();
    assert!(!local.is_empty().await);

    let owner = sync.resolve(signed_in("alice")).await;
    assert_eq!(owner, DataOwner::Identity("alice".to_string()));
    assert!(local.is_empty().await);
    assert!(sync.state().tasks.is_empty());

    sync.add_task("alice task", None).unwrap();
    sync.flush().await.unwrap();

    assert!(local.is_empty().await);
    assert_eq!(remote.writes(), vec!["alice".to_string()]);
    let document = remote.document("alice").await.unwrap();
    assert_eq!(document.tasks.unwrap()[0].title, "alice task");
}

#[tokio::test]
async fn test_sign_out_does_not_leak_identity_state() {
    let (mut sync, local, remote) = synchronizer();
    remote.seed("ada", &named_state("Ada", "secret plan")).await;

    sync.resolve(signed_in("ada")).await;
    assert_eq!(sync.state().tasks[0].title, "secret plan");

    sync.on_identity(IdentityReport::pending());
    assert_eq!(sync.resolve(IdentityReport::guest()).await, DataOwner::Guest);

    assert_eq!(sync.state(), &ApplicationState::default());
    sync.set_theme(Theme::Light).unwrap();
    sync.flush().await.unwrap();

    assert!(remote.writes().is_empty());
    assert_eq!(
        local.get(GuestKey::Tasks.as_str()).await.unwrap().as_deref(),
        Some("[]")
    );
    let document = remote.document("ada").await.unwrap();
    assert_eq!(document.theme, Some(Theme::Dark));
}

#[tokio::test]
async fn test_identity_change_drops_queued_write() {
    let (mut sync, _local, remote) = synchronizer();
    sync.resolve(signed_in("alice")).await;

    sync.set_theme(Theme::Light).unwrap();
    sync.on_identity(signed_in("bob"));
    sync.settle().await;
    sync.flush().await.unwrap();

    assert_eq!(sync.owner(), DataOwner::Identity("bob".to_string()));
    assert!(remote.writes().is_empty());
    assert!(remote.document("alice").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_late_load_for_superseded_identity_is_discarded() {
    let (mut sync, _local, remote) = synchronizer();
    remote.seed("alice", &named_state("Alice", "alice task")).await;
    remote.seed("bob", &named_state("Bob", "bob task")).await;
    remote.delay_reads("alice", Duration::from_secs(5));

    sync.on_identity(signed_in("alice"));
    let owner = sync.resolve(signed_in("bob")).await;
    assert_eq!(owner, DataOwner::Identity("bob".to_string()));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(sync.poll_loads());

    assert_eq!(sync.owner(), DataOwner::Identity("bob".to_string()));
    assert_eq!(sync.state().display_name, "Bob");

    sync.add_task("more", None).unwrap();
    sync.flush().await.unwrap();
    assert_eq!(remote.writes(), vec!["bob".to_string()]);
    let alice = remote.document("alice").await.unwrap();
    assert_eq!(alice.tasks.unwrap().len(), 1);
}

#[tokio::test]
async fn test_superseded_sign_in_keeps_guest_store() {
    let (mut sync, local, remote) = synchronizer();
    sync.resolve(IdentityReport::guest()).await;
    sync.add_task("guest task", None).unwrap();
    sync.flush().await.unwrap();

    sync.on_identity(signed_in("x"));
    assert_eq!(sync.resolve(IdentityReport::guest()).await, DataOwner::Guest);
    assert_eq!(sync.state().tasks.len(), 1);
    assert_ok!(sync.shutdown().await);

    assert!(!local.is_empty().await);
    let mut restarted = Synchronizer::new(local.clone(), remote.clone());
    restarted.resolve(IdentityReport::guest()).await;
    assert_eq!(restarted.state().tasks.len(), 1);
    assert_eq!(restarted.state().tasks[0].title, "guest task");
    assert!(remote.writes().is_empty());
}

// =============================================================================
// Load Tests
// =============================================================================

#[tokio::test]
async fn test_reloading_same_identity_is_idempotent() {
    let (mut sync, _local, remote) = synchronizer();
    remote.seed("alice", &named_state("Alice", "alice task")).await;

    sync.resolve(signed_in("alice")).await;
    let first = sync.state().clone();

    sync.on_identity(IdentityReport::pending());
    sync.resolve(signed_in("alice")).await;

    assert_eq!(sync.state(), &first);
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn test_new_identity_is_seeded_from_provider_name() {
    let (mut sync, _local, _remote) = synchronizer();
    let report = IdentityReport::signed_in(
        Identity::new("ada").with_display_name("Ada Lovelace"),
    );

    sync.resolve(report).await;

    assert_eq!(sync.state().display_name, "Ada");
    assert_eq!(sync.state().theme, Theme::Dark);
    assert!(sync.state().tasks.is_empty());
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_defaults() {
    let (mut sync, _local, remote) = synchronizer();
    remote.seed("ada", &named_state("Ada", "unreachable")).await;
    remote.fail_reads.store(true, Ordering::SeqCst);

    let owner = sync
        .resolve(IdentityReport::signed_in(
            Identity::new("ada").with_display_name("Ada Lovelace"),
        ))
        .await;

    assert_eq!(owner, DataOwner::Identity("ada".to_string()));
    assert!(sync.is_loaded());
    assert_eq!(sync.state().display_name, "Ada");
    assert!(sync.state().tasks.is_empty());
}

#[tokio::test]
async fn test_task_operations_persist_in_order() {
    let (mut sync, _local, remote) = synchronizer();
    sync.resolve(signed_in("alice")).await;

    let first = sync.add_task("first", None).unwrap();
    let second = sync.add_task("second", Some("docs at example.com")).unwrap();
    sync.toggle_task(first).unwrap();
    sync.move_task(first, 0).unwrap();
    sync.update_task(second, "second, edited", None).unwrap();
    sync.flush().await.unwrap();

    let tasks = remote.document("alice").await.unwrap().tasks.unwrap();
    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second, edited"]);
    assert!(tasks[0].completed);
    assert!(tasks[1].description.is_none());

    sync.remove_task(first).unwrap();
    sync.flush().await.unwrap();
    assert_eq!(remote.document("alice").await.unwrap().tasks.unwrap().len(), 1);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[tokio::test]
async fn test_from_config_persists_guest_state_to_files() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        remote: None,
        log_format: LogFormat::Pretty,
    };

    let mut sync = Synchronizer::from_config(&config).unwrap();
    sync.resolve(IdentityReport::guest()).await;
    sync.set_theme(Theme::Light).unwrap();
    assert_ok!(sync.shutdown().await);

    let theme = std::fs::read_to_string(dir.path().join("serene-theme")).unwrap();
    assert_eq!(theme, "light");
}
