use serde::{Deserialize, Serialize};

use crate::models::LeaveRequest;
use crate::notify::Notice;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginTab {
    #[default]
    Student,
    Teacher,
}

impl LoginTab {
    fn prefix(&self) -> &'static str {
        match self {
            LoginTab::Student => "STU",
            LoginTab::Teacher => "TCH",
        }
    }
}

/// Who is looking at the desk. A naming convention, not authentication:
/// anyone who knows the prefix can claim any id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    Student { student_id: String },
    Teacher { teacher_id: String },
}

impl Role {
    pub fn sign_in(tab: LoginTab, login_id: &str) -> Result<Role, Notice> {
        if login_id.trim().is_empty() {
            return Err(Notice::MissingLoginId);
        }

        let normalized = login_id.to_uppercase();
        if !normalized.starts_with(tab.prefix()) {
            return Err(match tab {
                LoginTab::Student => Notice::StudentPrefix,
                LoginTab::Teacher => Notice::TeacherPrefix,
            });
        }

        Ok(match tab {
            LoginTab::Student => Role::Student {
                student_id: normalized,
            },
            LoginTab::Teacher => Role::Teacher {
                teacher_id: normalized,
            },
        })
    }

    pub fn student_id(&self) -> Option<&str> {
        match self {
            Role::Student { student_id } => Some(student_id),
            Role::Teacher { .. } => None,
        }
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self, Role::Teacher { .. })
    }

    /// Read filter: students see their own requests, teachers see everything.
    pub fn can_see(&self, request: &LeaveRequest) -> bool {
        match self {
            Role::Student { student_id } => request.student_id == *student_id,
            Role::Teacher { .. } => true,
        }
    }
}
