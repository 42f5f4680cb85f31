use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::leave_request::{LeaveStatus, LeaveType, NewLeaveRequest, is_valid_total_days};
use crate::notify::Notice;

/// Form state as typed by the student. Everything stays text until submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDraft {
    pub student_name: String,
    pub student_id: String,
    pub leave_type: LeaveType,
    pub start_date: String,
    pub end_date: String,
    pub total_days: String,
    pub missed_subjects: String,
    pub reason: String,
}

/// Partial edit of a draft. The bound student id is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftUpdate {
    pub student_name: Option<String>,
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_days: Option<String>,
    pub missed_subjects: Option<String>,
    pub reason: Option<String>,
}

impl LeaveDraft {
    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, update: DraftUpdate) {
        if let Some(v) = update.student_name {
            self.student_name = v;
        }
        if let Some(v) = update.leave_type {
            self.leave_type = v;
        }
        if let Some(v) = update.start_date {
            self.start_date = v;
        }
        if let Some(v) = update.end_date {
            self.end_date = v;
        }
        if let Some(v) = update.total_days {
            self.total_days = v;
        }
        if let Some(v) = update.missed_subjects {
            self.missed_subjects = v;
        }
        if let Some(v) = update.reason {
            self.reason = v;
        }
    }

    /// Clears every field except the bound student id.
    pub fn reset(&mut self) {
        *self = Self::for_student(std::mem::take(&mut self.student_id));
    }

    /// Builds the record to create, stamped with `now`.
    pub fn to_request(&self, now: DateTime<Utc>) -> Result<NewLeaveRequest, Notice> {
        if self.student_name.trim().is_empty()
            || self.student_id.trim().is_empty()
            || self.start_date.trim().is_empty()
            || self.reason.trim().is_empty()
        {
            return Err(Notice::IncompleteForm);
        }

        let start_date = parse_date("Start date", &self.start_date)?;
        let end_date = match self.end_date.trim() {
            "" => None,
            _ => Some(parse_date("End date", &self.end_date)?),
        };

        let total_days = self
            .total_days
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|days| is_valid_total_days(*days))
            .ok_or(Notice::InvalidTotalDays)?;

        Ok(NewLeaveRequest {
            student_name: self.student_name.trim().to_string(),
            student_id: self.student_id.clone(),
            leave_type: self.leave_type,
            start_date,
            end_date,
            total_days,
            missed_subjects: self.missed_subjects.trim().to_string(),
            reason: self.reason.trim().to_string(),
            status: LeaveStatus::Pending,
            request_date: now.date_naive(),
            timestamp: now.timestamp_millis(),
        })
    }
}

fn parse_date(label: &str, value: &str) -> Result<NaiveDate, Notice> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Notice::InvalidDate(label.to_string()))
}
