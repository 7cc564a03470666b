//! Timesheet direct-edit service
//!
//! Staff create a timesheet by hand (with at least one other working hours
//! entry) or edit the remark and staff-entered entries of an existing one.

use std::sync::Arc;

use timesheet_domain::{
    CreateTimesheetRequest, OtherWorkingHours, Result, Timesheet, TimesheetAction, TimesheetError,
    TransportationExpense, UpdateTimesheetRequest,
};
use tracing::{info, instrument};

use super::ports::{
    ConfirmationWindow, TimesheetCommandWriter, TimesheetLoadOptions, TimesheetLookup,
    TimesheetReader,
};
use crate::audit::{ActionLogEmitter, ActionLogPublisher};
use crate::context::OperationContext;
use crate::ids::new_id;
use crate::lifecycle::permissions::{ensure_can_edit, ensure_owner_or_elevated};

/// Timesheet direct-edit service
pub struct TimesheetService {
    timesheets: Arc<dyn TimesheetReader>,
    writer: Arc<dyn TimesheetCommandWriter>,
    confirmation: Arc<dyn ConfirmationWindow>,
    action_logs: ActionLogEmitter,
}

impl TimesheetService {
    pub fn new(
        timesheets: Arc<dyn TimesheetReader>,
        writer: Arc<dyn TimesheetCommandWriter>,
        confirmation: Arc<dyn ConfirmationWindow>,
        publisher: Arc<dyn ActionLogPublisher>,
    ) -> Self {
        Self { timesheets, writer, confirmation, action_logs: ActionLogEmitter::new(publisher) }
    }

    /// Create a timesheet, returning its ID.
    ///
    /// An auto-created shell holding only lesson-hours is filled in rather
    /// than duplicated; a timesheet that already carries staff entries is
    /// reported as existing.
    #[instrument(skip(self, ctx, request), fields(staff_id = %request.staff_id, date = %request.date))]
    pub async fn create_timesheet(
        &self,
        ctx: &OperationContext,
        mut request: CreateTimesheetRequest,
    ) -> Result<String> {
        request.validate()?;

        let mut candidate =
            Timesheet::new_draft(request.staff_id.clone(), request.location_id.clone(), request.date);
        ensure_owner_or_elevated(ctx.requester(), &candidate)?;
        self.ensure_unlocked(ctx, &candidate).await?;

        let lookup = TimesheetLookup {
            staff_ids: vec![request.staff_id.clone()],
            location_id: request.location_id.clone(),
            date: request.date,
        };
        let existing = self
            .timesheets
            .find_by_lookup(ctx, &lookup, TimesheetLoadOptions::ALL)
            .await?
            .into_iter()
            .next();

        let (timesheet, action) = match existing {
            Some(found) if found.has_staff_entries() => {
                return Err(TimesheetError::AlreadyExists(format!(
                    "timesheet {} already exists for staff {} at location {} on {}",
                    found.id, found.staff_id, found.location_id, found.date
                )));
            }
            Some(mut shell) => {
                ensure_can_edit(ctx.requester(), &shell)?;
                shell.remark = request.remark;
                attach_entries(&mut shell, request.other_working_hours, request.transportation_expenses);
                ctx.ensure_active()?;
                self.writer.save_details(ctx, &shell).await?;
                (shell, TimesheetAction::Updated)
            }
            None => {
                candidate.remark = request.remark;
                candidate.assign_id(new_id());
                attach_entries(
                    &mut candidate,
                    request.other_working_hours,
                    request.transportation_expenses,
                );
                ctx.ensure_active()?;
                self.writer.insert_timesheet(ctx, &candidate).await?;
                (candidate, TimesheetAction::Created)
            }
        };

        info!(timesheet_id = %timesheet.id, %action, "Saved timesheet");
        self.action_logs.emit(ctx, [timesheet.id.as_str()], action, false).await?;
        Ok(timesheet.id)
    }

    /// Replace the remark and staff-entered entries of a timesheet.
    ///
    /// Entries carrying an ID update the matching row, entries without one
    /// are inserted, and rows missing from the request are soft-deleted.
    #[instrument(skip(self, ctx, request), fields(timesheet_id = %request.timesheet_id))]
    pub async fn update_timesheet(
        &self,
        ctx: &OperationContext,
        mut request: UpdateTimesheetRequest,
    ) -> Result<()> {
        request.validate()?;

        let mut timesheet = self
            .timesheets
            .find_by_id(ctx, &request.timesheet_id, TimesheetLoadOptions::ALL)
            .await?
            .ok_or_else(|| TimesheetError::NotFound(format!("timesheet {}", request.timesheet_id)))?;
        ensure_can_edit(ctx.requester(), &timesheet)?;
        self.ensure_unlocked(ctx, &timesheet).await?;

        timesheet.remark = request.remark;
        replace_entries(&timesheet.id, &mut timesheet.other_working_hours, request.other_working_hours)?;
        replace_entries(
            &timesheet.id,
            &mut timesheet.transportation_expenses,
            request.transportation_expenses,
        )?;
        if timesheet.is_empty() {
            return Err(TimesheetError::FailedPrecondition(
                "timesheet empty, cannot update anything".to_string(),
            ));
        }

        ctx.ensure_active()?;
        self.writer.save_details(ctx, &timesheet).await?;
        info!(timesheet_id = %timesheet.id, "Updated timesheet");

        self.action_logs.emit(ctx, [timesheet.id.as_str()], TimesheetAction::Updated, false).await?;
        Ok(())
    }

    async fn ensure_unlocked(&self, ctx: &OperationContext, timesheet: &Timesheet) -> Result<()> {
        if self
            .confirmation
            .is_period_locked(ctx, timesheet.date, &timesheet.location_id)
            .await?
        {
            return Err(locked_error(timesheet));
        }
        Ok(())
    }
}

/// Edits are refused once the confirmation period is locked.
pub(crate) fn locked_error(timesheet: &Timesheet) -> TimesheetError {
    TimesheetError::FailedPrecondition(format!(
        "timesheet period is already confirmed for location {} on {}",
        timesheet.location_id, timesheet.date
    ))
}

fn attach_entries(
    timesheet: &mut Timesheet,
    other_working_hours: Vec<OtherWorkingHours>,
    transportation_expenses: Vec<TransportationExpense>,
) {
    for mut owh in other_working_hours {
        owh.id = new_id();
        owh.timesheet_id.clone_from(&timesheet.id);
        timesheet.other_working_hours.push(owh);
    }
    for mut expense in transportation_expenses {
        expense.id = new_id();
        expense.timesheet_id.clone_from(&timesheet.id);
        timesheet.transportation_expenses.push(expense);
    }
}

/// Staff-entered row addressed by ID within its timesheet
trait StaffEntry {
    const KIND: &'static str;
    fn id(&self) -> &str;
    fn prepare(&mut self, timesheet_id: &str);
    fn assign_new_id(&mut self);
    fn is_deleted(&self) -> bool;
    fn mark_deleted(&mut self);
}

impl StaffEntry for OtherWorkingHours {
    const KIND: &'static str = "other working hours";

    fn id(&self) -> &str {
        &self.id
    }

    fn prepare(&mut self, timesheet_id: &str) {
        self.timesheet_id = timesheet_id.to_string();
        self.is_deleted = false;
    }

    fn assign_new_id(&mut self) {
        self.id = new_id();
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }
}

impl StaffEntry for TransportationExpense {
    const KIND: &'static str = "transportation expense";

    fn id(&self) -> &str {
        &self.id
    }

    fn prepare(&mut self, timesheet_id: &str) {
        self.timesheet_id = timesheet_id.to_string();
        self.is_deleted = false;
    }

    fn assign_new_id(&mut self) {
        self.id = new_id();
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }
}

/// Reconcile stored rows against the requested set.
fn replace_entries<T: StaffEntry>(
    timesheet_id: &str,
    stored: &mut Vec<T>,
    requested: Vec<T>,
) -> Result<()> {
    let mut kept: Vec<String> = Vec::with_capacity(requested.len());

    for mut entry in requested {
        entry.prepare(timesheet_id);
        if entry.id().is_empty() {
            entry.assign_new_id();
            kept.push(entry.id().to_string());
            stored.push(entry);
            continue;
        }
        let slot = stored
            .iter_mut()
            .find(|existing| existing.id() == entry.id() && !existing.is_deleted())
            .ok_or_else(|| unknown_entry(T::KIND, entry.id(), timesheet_id))?;
        kept.push(entry.id().to_string());
        *slot = entry;
    }

    for existing in stored.iter_mut() {
        if !kept.iter().any(|id| id == existing.id()) {
            existing.mark_deleted();
        }
    }
    Ok(())
}

fn unknown_entry(kind: &str, id: &str, timesheet_id: &str) -> TimesheetError {
    TimesheetError::InvalidArgument(format!("{kind} {id} does not belong to timesheet {timesheet_id}"))
}
