//! Permission guards
//!
//! Pure checks over the requester and the timesheet. "Owner" means the
//! requester is the timesheet's staff member; "elevated" means the
//! requester holds an approver/confirmer role.

use timesheet_domain::{Requester, Result, Timesheet, TimesheetError, TimesheetStatus};

fn denied(timesheet: &Timesheet) -> TimesheetError {
    TimesheetError::PermissionDenied(format!(
        "unauthorized to modify timesheet, staff id: {}",
        timesheet.staff_id
    ))
}

/// Owner or elevated.
///
/// # Errors
///
/// Returns [`TimesheetError::PermissionDenied`] otherwise.
pub fn ensure_owner_or_elevated(requester: &Requester, timesheet: &Timesheet) -> Result<()> {
    if requester.is_owner(&timesheet.staff_id) || requester.is_elevated() {
        Ok(())
    } else {
        Err(denied(timesheet))
    }
}

/// # Errors
///
/// Returns [`TimesheetError::PermissionDenied`] unless the requester holds
/// an elevated role.
pub fn ensure_elevated(requester: &Requester) -> Result<()> {
    if requester.is_elevated() {
        Ok(())
    } else {
        Err(TimesheetError::PermissionDenied(format!(
            "user {} is not allowed to approve or confirm timesheets",
            requester.user_id
        )))
    }
}

/// Deletion of a submitted timesheet needs an elevated role; drafts also
/// allow the owner. Call after the status precondition.
///
/// # Errors
///
/// Returns [`TimesheetError::PermissionDenied`] when the requester may not
/// delete in the current status.
pub fn ensure_can_delete(requester: &Requester, timesheet: &Timesheet) -> Result<()> {
    match timesheet.status {
        TimesheetStatus::Draft => ensure_owner_or_elevated(requester, timesheet),
        _ if requester.is_elevated() => Ok(()),
        _ => Err(denied(timesheet)),
    }
}

/// Direct edits: drafts by owner or elevated, submitted by elevated only,
/// nothing after approval.
///
/// # Errors
///
/// Returns [`TimesheetError::PermissionDenied`] when the requester may not
/// edit in the current status.
pub fn ensure_can_edit(requester: &Requester, timesheet: &Timesheet) -> Result<()> {
    match timesheet.status {
        TimesheetStatus::Draft => ensure_owner_or_elevated(requester, timesheet),
        TimesheetStatus::Submitted if requester.is_elevated() => Ok(()),
        _ => Err(denied(timesheet)),
    }
}
