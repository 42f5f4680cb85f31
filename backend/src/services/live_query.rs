use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{LeaveRequest, sort_newest_first};
use crate::notify::{Notice, Notifier};
use crate::store::{CollectionPath, DocumentStore, SnapshotEvent};

/// Keeps the shared list in step with the collection for as long as it lives.
pub struct LiveQuery {
    task: JoinHandle<()>,
}

impl LiveQuery {
    pub fn open(
        store: Arc<dyn DocumentStore>,
        path: CollectionPath,
        requests: Arc<watch::Sender<Vec<LeaveRequest>>>,
        notices: Arc<Mutex<Notifier>>,
    ) -> Self {
        let mut subscription = store.subscribe(path.clone());

        let task = tokio::spawn(async move {
            info!("Live query opened on {}", path);

            while let Some(event) = subscription.next().await {
                match event {
                    SnapshotEvent::Snapshot(mut snapshot) => {
                        sort_newest_first(&mut snapshot);
                        debug!("Snapshot of {} with {} leave requests", path, snapshot.len());
                        requests.send_replace(snapshot);
                    }
                    SnapshotEvent::Error(e) => {
                        // keep the last list we had
                        warn!("Live query on {} failed: {}", path, e);
                        notices.lock().await.show(Notice::SyncFailed);
                    }
                }
            }

            info!("Live query on {} closed", path);
        });

        Self { task }
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.task.abort();
    }
}
