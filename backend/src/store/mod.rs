pub mod dto;
pub mod firestore;
pub mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::{LeaveRequest, LeaveRequestPatch, NewLeaveRequest};

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

pub const COLLECTION_NAME: &str = "leave_requests";

/// `artifacts/{app_id}/public/data/leave_requests`: one shared table per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    app_id: String,
}

impl CollectionPath {
    pub fn leave_requests(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifacts/{}/public/data/{}", self.app_id, COLLECTION_NAME)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// The whole collection as the store currently sees it, in no particular order.
    Snapshot(Vec<LeaveRequest>),
    Error(String),
}

/// A standing query. Dropping the handle stops the feed.
pub struct Subscription {
    events: mpsc::Receiver<SnapshotEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn spawn<F, Fut>(feed: F) -> Self
    where
        F: FnOnce(mpsc::Sender<SnapshotEvent>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, events) = mpsc::channel(16);
        let task = tokio::spawn(feed(tx));
        Self { events, task }
    }

    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document and returns the id the store assigned to it.
    async fn create(&self, path: &CollectionPath, request: &NewLeaveRequest) -> Result<String, AppError>;
    async fn update(&self, path: &CollectionPath, id: &str, patch: &LeaveRequestPatch) -> Result<(), AppError>;
    async fn fetch_all(&self, path: &CollectionPath) -> Result<Vec<LeaveRequest>, AppError>;
    fn subscribe(self: Arc<Self>, path: CollectionPath) -> Subscription;
}

/// Stand-in used when no Firebase credentials are configured.
pub struct DisconnectedStore;

#[async_trait]
impl DocumentStore for DisconnectedStore {
    async fn create(&self, _path: &CollectionPath, _request: &NewLeaveRequest) -> Result<String, AppError> {
        Err(AppError::Unavailable("Firebase keys missing".to_string()))
    }

    async fn update(&self, _path: &CollectionPath, _id: &str, _patch: &LeaveRequestPatch) -> Result<(), AppError> {
        Err(AppError::Unavailable("Firebase keys missing".to_string()))
    }

    async fn fetch_all(&self, _path: &CollectionPath) -> Result<Vec<LeaveRequest>, AppError> {
        Err(AppError::Unavailable("Firebase keys missing".to_string()))
    }

    fn subscribe(self: Arc<Self>, _path: CollectionPath) -> Subscription {
        Subscription::spawn(|tx| async move {
            let _ = tx
                .send(SnapshotEvent::Error("Firebase keys missing".to_string()))
                .await;
        })
    }
}
