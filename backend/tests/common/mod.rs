#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use leave_desk::error::AppError;
use leave_desk::identity::{IdentityProvider, Session};
use leave_desk::models::{LeaveRequest, LeaveStatus, LeaveType, LoginTab};
use leave_desk::services::{LeaveDesk, SessionBootstrap, SessionState, Workspace};
use leave_desk::store::{CollectionPath, MemoryStore};

pub struct StaticIdentity {
    refuse: bool,
    lifetime: chrono::Duration,
    refresh_fails: bool,
}

impl StaticIdentity {
    pub fn accepting() -> Self {
        Self {
            refuse: false,
            lifetime: chrono::Duration::hours(1),
            refresh_fails: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::accepting()
        }
    }

    /// Issues sessions already inside the refresh margin.
    pub fn short_lived() -> Self {
        Self {
            lifetime: chrono::Duration::seconds(30),
            ..Self::accepting()
        }
    }

    /// Like `short_lived`, but every refresh is turned down.
    pub fn expiring() -> Self {
        Self {
            refresh_fails: true,
            ..Self::short_lived()
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn establish_session(&self, token: Option<&str>) -> Result<Session, AppError> {
        if self.refuse {
            return Err(AppError::Identity("sign-in refused".to_string()));
        }
        Ok(Session {
            uid: Some("test-user".to_string()),
            id_token: "id-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_at: Utc::now() + self.lifetime,
            anonymous: token.is_none(),
        })
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AppError> {
        if self.refresh_fails {
            return Err(AppError::Identity("refresh token revoked".to_string()));
        }
        Ok(Session {
            id_token: "renewed-id-token".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            ..session.clone()
        })
    }
}

/// Waits until the published session state satisfies `done`.
pub async fn wait_for_session<F>(session: &SessionBootstrap, done: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async move {
        loop {
            {
                let current = rx.borrow_and_update();
                if done(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("session feed closed");
        }
    })
    .await
    .expect("timed out waiting for the session")
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub session: SessionBootstrap,
    pub desk: Arc<LeaveDesk>,
}

pub fn path() -> CollectionPath {
    CollectionPath::leave_requests("test-app")
}

pub fn harness(identity: StaticIdentity) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let session = SessionBootstrap::new(Arc::new(identity));
    let desk = Arc::new(LeaveDesk::new(
        store.clone(),
        path(),
        session.subscribe(),
        Duration::from_secs(3),
    ));
    desk.start();
    Harness { store, session, desk }
}

pub async fn signed_in() -> Harness {
    let harness = harness(StaticIdentity::accepting());
    harness.session.start(true, None).await;
    harness
}

pub fn logged_in(desk: &LeaveDesk, tab: LoginTab, login_id: &str) -> Workspace {
    let mut workspace = desk.new_workspace();
    desk.login(&mut workspace, tab, login_id).expect("login");
    workspace
}

/// Waits until the synchronized list satisfies `done`.
pub async fn wait_for_requests<F>(desk: &LeaveDesk, done: F) -> Vec<LeaveRequest>
where
    F: Fn(&[LeaveRequest]) -> bool,
{
    let mut rx = desk.watch_requests();
    tokio::time::timeout(Duration::from_secs(2), async move {
        loop {
            {
                let current = rx.borrow_and_update();
                if done(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("request feed closed");
        }
    })
    .await
    .expect("timed out waiting for the live query")
}

pub fn record(id: &str, student_id: &str, timestamp: i64, status: LeaveStatus) -> LeaveRequest {
    LeaveRequest {
        id: id.to_string(),
        student_name: format!("Student {}", student_id),
        student_id: student_id.to_string(),
        leave_type: LeaveType::Sick,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        end_date: None,
        total_days: 1.0,
        missed_subjects: String::new(),
        reason: "flu".to_string(),
        status,
        request_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        timestamp,
    }
}
