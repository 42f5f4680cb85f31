pub mod draft;
pub mod leave_request;
pub mod role;

pub use draft::{DraftUpdate, LeaveDraft};
pub use leave_request::{
    Decision, LeaveRequest, LeaveRequestPatch, LeaveStatus, LeaveType, NewLeaveRequest,
    sort_newest_first,
};
pub use role::{LoginTab, Role};
