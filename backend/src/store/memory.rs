use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{LeaveRequest, LeaveRequestPatch, NewLeaveRequest};
use crate::store::{CollectionPath, DocumentStore, SnapshotEvent, Subscription};

const OFFLINE: &str = "simulated network error";

/// In-process document store with push fan-out. `set_offline` makes every
/// call fail, which is how tests stand in for a dropped connection.
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionPath, Vec<LeaveRequest>>>,
    /// `None` means every collection changed.
    changes: broadcast::Sender<Option<CollectionPath>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
            offline: AtomicBool::new(false),
        }
    }

    /// Puts a record in as-is, id included.
    pub async fn seed(&self, path: &CollectionPath, request: LeaveRequest) {
        self.collections
            .write()
            .await
            .entry(path.clone())
            .or_default()
            .push(request);
        let _ = self.changes.send(Some(path.clone()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        let _ = self.changes.send(None);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Store(OFFLINE.to_string()));
        }
        Ok(())
    }

    async fn snapshot(&self, path: &CollectionPath) -> SnapshotEvent {
        match self.fetch_all(path).await {
            Ok(requests) => SnapshotEvent::Snapshot(requests),
            Err(e) => SnapshotEvent::Error(e.to_string()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, path: &CollectionPath, request: &NewLeaveRequest) -> Result<String, AppError> {
        self.check_online()?;

        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(path.clone())
            .or_default()
            .push(request.clone().with_id(id.clone()));
        debug!("Created leave request {} in {}", id, path);

        let _ = self.changes.send(Some(path.clone()));
        Ok(id)
    }

    async fn update(&self, path: &CollectionPath, id: &str, patch: &LeaveRequestPatch) -> Result<(), AppError> {
        self.check_online()?;

        {
            let mut collections = self.collections.write().await;
            let request = collections
                .get_mut(path)
                .and_then(|requests| requests.iter_mut().find(|r| r.id == id))
                .ok_or(AppError::NotFound)?;
            request.status = patch.status;
        }

        let _ = self.changes.send(Some(path.clone()));
        Ok(())
    }

    async fn fetch_all(&self, path: &CollectionPath) -> Result<Vec<LeaveRequest>, AppError> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn subscribe(self: Arc<Self>, path: CollectionPath) -> Subscription {
        let mut changes = self.changes.subscribe();

        Subscription::spawn(move |tx| async move {
            if tx.send(self.snapshot(&path).await).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(Some(changed)) if changed != path => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if tx.send(self.snapshot(&path).await).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
