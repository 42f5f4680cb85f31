use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::identity::{IdentityProvider, Session};

/// Renew this long before the id token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Bootstrapping,
    SignedIn(Session),
    /// No backend: credentials missing or sign-in failed. Reads and writes are off.
    Degraded(String),
    SignedOut,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }

    pub fn is_bootstrapping(&self) -> bool {
        matches!(self, SessionState::Bootstrapping)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Bootstrapping => "bootstrapping",
            SessionState::SignedIn(_) => "signed_in",
            SessionState::Degraded(_) => "degraded",
            SessionState::SignedOut => "signed_out",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub state: &'static str,
    pub connected: bool,
    pub bootstrapping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&SessionState> for SessionStatus {
    fn from(state: &SessionState) -> Self {
        Self {
            state: state.label(),
            connected: state.is_signed_in(),
            bootstrapping: state.is_bootstrapping(),
            reason: match state {
                SessionState::Degraded(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

/// Makes the single sign-in attempt and publishes the outcome to every watcher.
pub struct SessionBootstrap {
    identity: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionState>>,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl SessionBootstrap {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::Bootstrapping);
        Self {
            identity,
            state: Arc::new(state),
            refresher: Mutex::new(None),
        }
    }

    /// Fires with the current state and on every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn start(&self, configured: bool, token: Option<&str>) -> SessionState {
        if !configured {
            warn!("Firebase keys missing, running without a backend");
            return self.publish(SessionState::Degraded("Firebase keys missing".to_string()));
        }

        match self.identity.establish_session(token).await {
            Ok(session) => {
                info!(
                    "Session established (uid: {}, anonymous: {})",
                    session.uid.as_deref().unwrap_or("unknown"),
                    session.anonymous
                );
                let state = self.publish(SessionState::SignedIn(session));
                self.spawn_refresher();
                state
            }
            Err(e) => {
                warn!("Sign-in failed, running without a backend: {}", e);
                self.publish(SessionState::Degraded(e.to_string()))
            }
        }
    }

    pub fn end(&self) {
        self.stop_refresher();
        info!("Session ended");
        self.publish(SessionState::SignedOut);
    }

    fn publish(&self, state: SessionState) -> SessionState {
        self.state.send_replace(state.clone());
        state
    }

    fn spawn_refresher(&self) {
        let identity = self.identity.clone();
        let state = self.state.clone();

        let task = tokio::spawn(async move {
            loop {
                let session = match &*state.borrow() {
                    SessionState::SignedIn(session) => session.clone(),
                    _ => break,
                };

                let wait = (session.expires_at - Utc::now())
                    .num_seconds()
                    .saturating_sub(REFRESH_MARGIN_SECS)
                    .max(0);
                tokio::time::sleep(Duration::from_secs(wait as u64)).await;

                match identity.refresh(&session).await {
                    Ok(renewed) => {
                        info!("Session token refreshed");
                        state.send_replace(SessionState::SignedIn(renewed));
                    }
                    Err(e) => {
                        warn!("Session refresh failed: {}", e);
                        state.send_replace(SessionState::Degraded(e.to_string()));
                        break;
                    }
                }
            }
        });

        if let Ok(mut refresher) = self.refresher.lock() {
            if let Some(previous) = refresher.replace(task) {
                previous.abort();
            }
        }
    }

    fn stop_refresher(&self) {
        if let Ok(mut refresher) = self.refresher.lock() {
            if let Some(task) = refresher.take() {
                task.abort();
            }
        }
    }
}

impl Drop for SessionBootstrap {
    fn drop(&mut self) {
        self.stop_refresher();
    }
}
