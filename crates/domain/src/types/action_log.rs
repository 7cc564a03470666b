//! Outbound audit and lock messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimesheetAction {
    Created,
    Updated,
    Deleted,
    Submitted,
    Approved,
    CancelledApprove,
    Confirmed,
    CancelledSubmission,
    UpdatedLesson,
}

impl_domain_status_conversions!(TimesheetAction {
    Created => "CREATED",
    Updated => "UPDATED",
    Deleted => "DELETED",
    Submitted => "SUBMITTED",
    Approved => "APPROVED",
    CancelledApprove => "CANCELLED_APPROVE",
    Confirmed => "CONFIRMED",
    CancelledSubmission => "CANCELLED_SUBMISSION",
    UpdatedLesson => "UPDATED_LESSON",
});

/// One audit event per affected timesheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetActionLog {
    pub timesheet_id: String,
    pub action: TimesheetAction,
    pub executed_by: String,
    /// Raised by reconciliation rather than a user request.
    pub is_system: bool,
    pub executed_at: DateTime<Utc>,
}

/// Lessons whose hours were approved and must no longer change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonLockEvent {
    pub lesson_ids: Vec<String>,
}
