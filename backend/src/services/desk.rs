use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{
    Decision, DraftUpdate, LeaveDraft, LeaveRequest, LeaveRequestPatch, LoginTab, Role,
};
use crate::notify::{Notice, NotificationView, Notifier};
use crate::services::live_query::LiveQuery;
use crate::services::session::SessionState;
use crate::store::{CollectionPath, DocumentStore};

/// What one browser tab holds: who is signed in there, their draft and their toast.
#[derive(Debug, Clone)]
pub struct Workspace {
    role: Option<Role>,
    draft: LeaveDraft,
    notifier: Notifier,
}

impl Workspace {
    pub fn new(notification_ttl: Duration) -> Self {
        Self {
            role: None,
            draft: LeaveDraft::default(),
            notifier: Notifier::new(notification_ttl),
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn draft(&self) -> &LeaveDraft {
        &self.draft
    }

    pub fn notification(&self) -> Option<NotificationView> {
        self.notifier.current().map(NotificationView::from)
    }

    fn fail(&mut self, notice: Notice, wrap: fn(Notice) -> AppError) -> AppError {
        self.notifier.show(notice.clone());
        wrap(notice)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCard {
    #[serde(flatten)]
    pub request: LeaveRequest,
    /// Empty once the request has left `pending`, and always for students.
    pub actions: Vec<Decision>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub role: Option<Role>,
    pub connected: bool,
    pub bootstrapping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<LeaveDraft>,
    pub requests: Vec<RequestCard>,
    pub pending: usize,
    pub total: usize,
    pub notification: Option<NotificationView>,
}

/// Owns everything the tabs share: the session signal, the synchronized list
/// and the live query feeding it.
pub struct LeaveDesk {
    store: Arc<dyn DocumentStore>,
    path: CollectionPath,
    session: watch::Receiver<SessionState>,
    requests: Arc<watch::Sender<Vec<LeaveRequest>>>,
    notices: Arc<Mutex<Notifier>>,
    notification_ttl: Duration,
    sync: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl LeaveDesk {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        path: CollectionPath,
        session: watch::Receiver<SessionState>,
        notification_ttl: Duration,
    ) -> Self {
        let (requests, _) = watch::channel(Vec::new());
        Self {
            store,
            path,
            session,
            requests: Arc::new(requests),
            notices: Arc::new(Mutex::new(Notifier::new(notification_ttl))),
            notification_ttl,
            sync: std::sync::Mutex::new(None),
        }
    }

    /// Opens the live query whenever the session is signed in and releases it
    /// as soon as it is not.
    pub fn start(&self) {
        let mut session = self.session.clone();
        let store = self.store.clone();
        let path = self.path.clone();
        let requests = self.requests.clone();
        let notices = self.notices.clone();

        let task = tokio::spawn(async move {
            let mut live: Option<LiveQuery> = None;

            loop {
                let signed_in = session.borrow_and_update().is_signed_in();
                match (signed_in, live.is_some()) {
                    (true, false) => {
                        live = Some(LiveQuery::open(
                            store.clone(),
                            path.clone(),
                            requests.clone(),
                            notices.clone(),
                        ));
                    }
                    (false, true) => {
                        info!("Session is gone, releasing live query on {}", path);
                        live = None;
                    }
                    _ => {}
                }

                if session.changed().await.is_err() {
                    break;
                }
            }
        });

        if let Ok(mut sync) = self.sync.lock() {
            if let Some(previous) = sync.replace(task) {
                previous.abort();
            }
        }
    }

    pub fn shutdown(&self) {
        if let Ok(mut sync) = self.sync.lock() {
            if let Some(task) = sync.take() {
                info!("Shutting down live sync on {}", self.path);
                task.abort();
            }
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().is_signed_in()
    }

    /// Change feed of the synchronized list, newest request first.
    pub fn watch_requests(&self) -> watch::Receiver<Vec<LeaveRequest>> {
        self.requests.subscribe()
    }

    pub fn all_requests(&self) -> Vec<LeaveRequest> {
        self.requests.borrow().clone()
    }

    pub fn new_workspace(&self) -> Workspace {
        Workspace::new(self.notification_ttl)
    }

    pub fn login(&self, workspace: &mut Workspace, tab: LoginTab, login_id: &str) -> Result<(), AppError> {
        let role = Role::sign_in(tab, login_id).map_err(|n| workspace.fail(n, AppError::Validation))?;

        if let Some(student_id) = role.student_id() {
            workspace.draft.student_id = student_id.to_string();
        }
        info!("Workspace signed in as {:?}", role);
        workspace.role = Some(role);
        workspace.notifier.show(Notice::SignedIn);
        Ok(())
    }

    pub fn logout(&self, workspace: &mut Workspace) {
        workspace.role = None;
        workspace.draft = LeaveDraft::default();
    }

    pub fn edit_draft(&self, workspace: &mut Workspace, update: DraftUpdate) -> Result<(), AppError> {
        if !matches!(workspace.role, Some(Role::Student { .. })) {
            return Err(workspace.fail(Notice::StudentsOnly, AppError::Forbidden));
        }
        workspace.draft.apply(update);
        Ok(())
    }

    /// Validates the draft and creates one pending request. The draft survives a failed write.
    pub async fn submit(&self, workspace: &mut Workspace) -> Result<String, AppError> {
        if !matches!(workspace.role, Some(Role::Student { .. })) {
            return Err(workspace.fail(Notice::StudentsOnly, AppError::Forbidden));
        }
        if !self.is_connected() {
            return Err(workspace.fail(Notice::Offline, |n| AppError::Unavailable(n.to_string())));
        }

        let request = workspace
            .draft
            .to_request(Utc::now())
            .map_err(|n| workspace.fail(n, AppError::Validation))?;

        match self.store.create(&self.path, &request).await {
            Ok(id) => {
                info!("Leave request {} submitted by {}", id, request.student_id);
                workspace.draft.reset();
                workspace.notifier.show(Notice::Submitted);
                Ok(id)
            }
            Err(e) => {
                warn!("Failed to submit leave request: {}", e);
                workspace.notifier.show(Notice::SubmitFailed);
                Err(e)
            }
        }
    }

    /// Approves or rejects a pending request. The shown status only changes
    /// when the store pushes the update back.
    pub async fn decide(&self, workspace: &mut Workspace, id: &str, decision: Decision) -> Result<(), AppError> {
        if !workspace.role.as_ref().is_some_and(Role::is_teacher) {
            return Err(workspace.fail(Notice::TeachersOnly, AppError::Forbidden));
        }
        if !self.is_connected() {
            return Err(workspace.fail(Notice::Offline, |n| AppError::Unavailable(n.to_string())));
        }

        let current = self
            .requests
            .borrow()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status);
        let Some(status) = current else {
            workspace.notifier.show(Notice::UnknownRequest);
            return Err(AppError::NotFound);
        };
        let target = status
            .decide(decision)
            .map_err(|n| workspace.fail(n, AppError::Conflict))?;

        match self.store.update(&self.path, id, &LeaveRequestPatch { status: target }).await {
            Ok(()) => {
                info!("Leave request {} set to {}", id, target.as_str());
                workspace.notifier.show(decision.notice());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to update leave request {}: {}", id, e);
                workspace.notifier.show(Notice::ActionFailed);
                Err(e)
            }
        }
    }

    /// The list this workspace may see, newest first.
    pub fn displayed(&self, workspace: &Workspace) -> Vec<LeaveRequest> {
        match &workspace.role {
            Some(role) => self
                .requests
                .borrow()
                .iter()
                .filter(|r| role.can_see(r))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub async fn view(&self, workspace: &Workspace) -> WorkspaceView {
        let displayed = self.displayed(workspace);
        let pending = displayed.iter().filter(|r| r.status.is_pending()).count();
        let total = displayed.len();

        let requests = displayed
            .into_iter()
            .map(|request| RequestCard {
                actions: actions_for(workspace.role.as_ref(), &request),
                request,
            })
            .collect();

        let notification = match workspace.notification() {
            Some(notification) => Some(notification),
            None => self.notices.lock().await.current().map(NotificationView::from),
        };

        let state = self.session_state();
        WorkspaceView {
            role: workspace.role.clone(),
            connected: state.is_signed_in(),
            bootstrapping: state.is_bootstrapping(),
            draft: match workspace.role {
                Some(Role::Student { .. }) => Some(workspace.draft.clone()),
                _ => None,
            },
            requests,
            pending,
            total,
            notification,
        }
    }
}

impl Drop for LeaveDesk {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Approve and reject are offered together, to teachers, on pending requests only.
pub fn actions_for(role: Option<&Role>, request: &LeaveRequest) -> Vec<Decision> {
    match role {
        Some(role) if role.is_teacher() && request.status.is_pending() => {
            vec![Decision::Approve, Decision::Reject]
        }
        _ => Vec::new(),
    }
}
