use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

/// Every user-facing message the desk can raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Notice {
    #[error("Please enter your ID.")]
    MissingLoginId,
    #[error("Student ID must start with 'STU' (e.g. STU-001).")]
    StudentPrefix,
    #[error("Teacher ID must start with 'TCH' (e.g. TCH-001).")]
    TeacherPrefix,
    #[error("Signed in successfully.")]
    SignedIn,
    #[error("Sign in first.")]
    NotSignedIn,
    #[error("Cannot reach the leave register. Check your connection.")]
    Offline,
    #[error("Please fill in all required fields.")]
    IncompleteForm,
    #[error("{0} must be a date in YYYY-MM-DD form.")]
    InvalidDate(String),
    #[error("Total days must be a positive number in steps of 0.5.")]
    InvalidTotalDays,
    #[error("Leave request submitted.")]
    Submitted,
    #[error("Submission failed. Please try again.")]
    SubmitFailed,
    #[error("Only students can submit leave requests.")]
    StudentsOnly,
    #[error("Only teachers can approve or reject leave requests.")]
    TeachersOnly,
    #[error("Leave request not found.")]
    UnknownRequest,
    #[error("This leave request has already been decided.")]
    AlreadyDecided,
    #[error("Leave approved.")]
    Approved,
    #[error("Leave rejected.")]
    Rejected,
    #[error("Action failed.")]
    ActionFailed,
    #[error("Could not load leave requests.")]
    SyncFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

impl Notice {
    pub fn kind(&self) -> NoticeKind {
        match self {
            Notice::SignedIn | Notice::Submitted | Notice::Approved | Notice::Rejected => {
                NoticeKind::Success
            }
            _ => NoticeKind::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub notice: Notice,
    pub raised_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub message: String,
    pub kind: NoticeKind,
}

impl From<&Notification> for NotificationView {
    fn from(notification: &Notification) -> Self {
        Self {
            message: notification.notice.to_string(),
            kind: notification.notice.kind(),
        }
    }
}

/// Holds at most one transient notification; a newer one replaces the older.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, notice: Notice) {
        self.current = Some(Notification {
            notice,
            raised_at: Instant::now(),
        });
    }

    /// The live notification, if it has not expired yet.
    pub fn current(&self) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|n| n.raised_at.elapsed() < self.ttl)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}
