use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::{LeaveDesk, Workspace};

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<LeaveDesk>,
    pub workspaces: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Workspace>>>>>,
}

impl AppState {
    pub fn new(desk: Arc<LeaveDesk>) -> Self {
        Self {
            desk,
            workspaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn open_workspace(&self) -> Uuid {
        let id = Uuid::new_v4();
        let workspace = Arc::new(Mutex::new(self.desk.new_workspace()));
        self.workspaces.write().await.insert(id, workspace);
        id
    }

    pub async fn workspace(&self, id: Uuid) -> Result<Arc<Mutex<Workspace>>, AppError> {
        self.workspaces
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    pub async fn close_workspace(&self, id: Uuid) -> bool {
        self.workspaces.write().await.remove(&id).is_some()
    }
}
