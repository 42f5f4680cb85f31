use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::notify::Notice;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    #[default]
    Sick,
    Personal,
    Other,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Sick => "sick",
            LeaveType::Personal => "personal",
            LeaveType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sick" => Some(LeaveType::Sick),
            "personal" => Some(LeaveType::Personal),
            "other" => Some(LeaveType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(LeaveStatus::Pending),
            "approved" => Some(LeaveStatus::Approved),
            "rejected" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LeaveStatus::Pending)
    }

    /// Applies a teacher decision. Only `pending` has outgoing edges.
    pub fn decide(self, decision: Decision) -> Result<LeaveStatus, Notice> {
        match self {
            LeaveStatus::Pending => Ok(decision.target()),
            LeaveStatus::Approved | LeaveStatus::Rejected => Err(Notice::AlreadyDecided),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(&self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            Decision::Approve => Notice::Approved,
            Decision::Reject => Notice::Rejected,
        }
    }
}

/// A leave request as stored in the shared collection, minus the store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeaveRequest {
    pub student_name: String,
    pub student_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_days: f64,
    pub missed_subjects: String,
    pub reason: String,
    pub status: LeaveStatus,
    pub request_date: NaiveDate,
    pub timestamp: i64,
}

impl NewLeaveRequest {
    pub fn with_id(self, id: String) -> LeaveRequest {
        LeaveRequest {
            id,
            student_name: self.student_name,
            student_id: self.student_id,
            leave_type: self.leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days: self.total_days,
            missed_subjects: self.missed_subjects,
            reason: self.reason,
            status: self.status,
            request_date: self.request_date,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: String,
    pub student_name: String,
    pub student_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_days: f64,
    pub missed_subjects: String,
    pub reason: String,
    pub status: LeaveStatus,
    pub request_date: NaiveDate,
    pub timestamp: i64,
}

/// Status-only patch sent by the action panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequestPatch {
    pub status: LeaveStatus,
}

/// Newest first. Stable, so equal timestamps keep delivery order.
pub fn sort_newest_first(requests: &mut [LeaveRequest]) {
    requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Total days must be a positive whole or half number of days.
pub fn is_valid_total_days(days: f64) -> bool {
    days.is_finite() && days > 0.0 && (days * 2.0).fract() == 0.0
}
