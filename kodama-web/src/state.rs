use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, info};

use kodama_data::{DataSource, Instance, Node, RejectedRecord, Snapshot};

const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// Shared application state accessible by all handlers
pub struct AppState {
    /// Directory holding the orchestrator exports, if any
    data_dir: Option<PathBuf>,
    /// Age after which a node's heartbeat is flagged stale
    heartbeat_timeout: Duration,
    /// Last successfully loaded snapshot
    snapshot: RwLock<Snapshot>,
    /// Held for a whole read-and-swap so reloads land in the order they started
    reload_lock: Mutex<()>,
    /// Broadcast channel for notifying WebSocket clients of updates
    update_tx: broadcast::Sender<()>,
}

impl AppState {
    /// State with no data directory; always serves an empty snapshot.
    pub fn new() -> Arc<Self> {
        Self::build(None, DEFAULT_HEARTBEAT_TIMEOUT)
    }

    pub fn with_data_dir(data_dir: &Path) -> Arc<Self> {
        Self::build(Some(data_dir.to_path_buf()), DEFAULT_HEARTBEAT_TIMEOUT)
    }

    pub fn with_config(data_dir: &Path, heartbeat_timeout: Duration) -> Arc<Self> {
        Self::build(Some(data_dir.to_path_buf()), heartbeat_timeout)
    }

    fn build(data_dir: Option<PathBuf>, heartbeat_timeout: Duration) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            data_dir,
            heartbeat_timeout,
            snapshot: RwLock::new(Snapshot::default()),
            reload_lock: Mutex::new(()),
            update_tx,
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.snapshot.read().await.nodes.clone()
    }

    pub async fn get_node(&self, id: &str) -> Option<Node> {
        self.snapshot
            .read()
            .await
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub async fn instances(&self) -> Vec<Instance> {
        self.snapshot.read().await.instances.clone()
    }

    pub async fn get_instance(&self, id: &str) -> Option<Instance> {
        self.snapshot
            .read()
            .await
            .instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub async fn rejected(&self) -> Vec<RejectedRecord> {
        self.snapshot.read().await.rejected.clone()
    }

    /// Counts for the current snapshot: (nodes, instances, rejected).
    pub async fn counts(&self) -> (usize, usize, usize) {
        let snapshot = self.snapshot.read().await;
        (
            snapshot.nodes.len(),
            snapshot.instances.len(),
            snapshot.rejected.len(),
        )
    }

    /// Reload the snapshot from disk and notify subscribers.
    ///
    /// Reloads are serialized: a reload that starts after another one
    /// finishes its swap after it too, so an older read never replaces a
    /// newer one. If the exports cannot be read the previous snapshot stays
    /// in place.
    pub async fn reload(&self) {
        let Some(data_dir) = self.data_dir.clone() else {
            let _ = self.update_tx.send(());
            return;
        };

        let _guard = self.reload_lock.lock().await;

        let source = DataSource::new(&data_dir);
        let loaded = match tokio::task::spawn_blocking(move || source.load_snapshot()).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "reload task panicked, keeping previous snapshot");
                return;
            }
        };

        match loaded {
            Ok(snapshot) => {
                info!(
                    nodes = snapshot.nodes.len(),
                    instances = snapshot.instances.len(),
                    rejected = snapshot.rejected.len(),
                    "reloaded snapshot"
                );
                *self.snapshot.write().await = snapshot;
                let _ = self.update_tx.send(());
            }
            Err(e) => {
                error!(error = %e, dir = %data_dir.display(), "reload failed, keeping previous snapshot");
            }
        }
    }

    /// Subscribe to update notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.update_tx.subscribe()
    }
}
