//! Timesheet lifecycle state machine
//!
//! DRAFT -> SUBMITTED -> APPROVED -> CONFIRMED, with SUBMITTED -> DRAFT
//! (cancel submission) and APPROVED -> SUBMITTED (cancel approval). Drafts
//! and submitted timesheets may also be deleted.
//!
//! Every operation checks permission, then status, then its own validity
//! rules, commits the state change, and only then publishes action logs.
//! A publish failure is still returned to the caller.

use std::sync::Arc;

use ahash::AHashSet;
use timesheet_domain::{
    BusinessCalendar, LessonLockEvent, Result, Timesheet, TimesheetAction, TimesheetError,
    TimesheetStatus,
};
use tracing::{info, instrument};

use super::permissions::{ensure_can_delete, ensure_elevated, ensure_owner_or_elevated};
use crate::audit::{ActionLogEmitter, ActionLogPublisher, LessonLockPublisher};
use crate::context::OperationContext;
use crate::lesson::ports::LessonReader;
use crate::timesheet::ports::{
    ConfirmationWindow, LifecycleWriter, TimesheetLoadOptions, TimesheetReader,
};
use crate::timesheet::service::locked_error;

/// Timesheet lifecycle service
pub struct TimesheetStateMachine {
    timesheets: Arc<dyn TimesheetReader>,
    writer: Arc<dyn LifecycleWriter>,
    lessons: Arc<dyn LessonReader>,
    confirmation: Arc<dyn ConfirmationWindow>,
    lesson_locks: Arc<dyn LessonLockPublisher>,
    action_logs: ActionLogEmitter,
    calendar: BusinessCalendar,
}

impl TimesheetStateMachine {
    pub fn new(
        timesheets: Arc<dyn TimesheetReader>,
        writer: Arc<dyn LifecycleWriter>,
        lessons: Arc<dyn LessonReader>,
        confirmation: Arc<dyn ConfirmationWindow>,
        action_logs: Arc<dyn ActionLogPublisher>,
        lesson_locks: Arc<dyn LessonLockPublisher>,
    ) -> Self {
        Self {
            timesheets,
            writer,
            lessons,
            confirmation,
            lesson_locks,
            action_logs: ActionLogEmitter::new(action_logs),
            calendar: BusinessCalendar::default(),
        }
    }

    /// Calendar deciding "today" for the submit date check.
    #[must_use]
    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Delete a draft or submitted timesheet.
    ///
    /// Staff entries are always removed. The timesheet row itself is kept
    /// as an empty shell when it is dated today or later and still holds
    /// lesson-hours, so later lesson events can reconcile into it.
    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &OperationContext, timesheet_id: &str) -> Result<()> {
        let timesheet = self.load(ctx, timesheet_id, TimesheetLoadOptions::LESSON_HOURS).await?;
        ensure_owner_or_elevated(ctx.requester(), &timesheet)?;
        if !matches!(timesheet.status, TimesheetStatus::Draft | TimesheetStatus::Submitted) {
            return Err(TimesheetError::FailedPrecondition(format!(
                "can not delete timesheet {timesheet_id} in : {} status",
                timesheet.status
            )));
        }
        ensure_can_delete(ctx.requester(), &timesheet)?;

        if timesheet.live_lesson_hours().any(|lh| lh.flag_on) {
            return Err(TimesheetError::FailedPrecondition(
                "timesheet record has lesson record".to_string(),
            ));
        }
        if self
            .confirmation
            .is_period_locked(ctx, timesheet.date, &timesheet.location_id)
            .await?
        {
            return Err(locked_error(&timesheet));
        }

        let today = self.calendar.today(ctx.now());
        let delete_timesheet =
            timesheet.is_past(today) || timesheet.live_lesson_hours().next().is_none();

        ctx.ensure_active()?;
        self.writer.soft_delete(ctx, timesheet_id, delete_timesheet).await?;
        info!(timesheet_id, delete_timesheet, "Deleted timesheet");

        self.action_logs.emit(ctx, [timesheet_id], TimesheetAction::Deleted, false).await?;
        Ok(())
    }

    /// Submit a draft dated today or earlier.
    #[instrument(skip(self, ctx))]
    pub async fn submit(&self, ctx: &OperationContext, timesheet_id: &str) -> Result<()> {
        let timesheet = self.load(ctx, timesheet_id, TimesheetLoadOptions::LESSON_HOURS).await?;
        ensure_owner_or_elevated(ctx.requester(), &timesheet)?;
        expect_status(&timesheet, TimesheetStatus::Draft)?;

        if timesheet.date > self.calendar.today(ctx.now()) {
            return Err(TimesheetError::FailedPrecondition(
                "timesheet date should not be in future".to_string(),
            ));
        }
        self.validate_lesson_statuses(ctx, std::slice::from_ref(&timesheet)).await?;

        self.transition(
            ctx,
            &[timesheet.id],
            TimesheetStatus::Draft,
            TimesheetStatus::Submitted,
            TimesheetAction::Submitted,
        )
        .await
    }

    /// Approve a batch of submitted timesheets and lock their lessons.
    ///
    /// The lesson lock is published inside the approval transaction, so a
    /// failed lock leaves every timesheet SUBMITTED.
    #[instrument(skip(self, ctx), fields(count = timesheet_ids.len()))]
    pub async fn approve(&self, ctx: &OperationContext, timesheet_ids: &[String]) -> Result<()> {
        ensure_elevated(ctx.requester())?;
        let ids = requested_ids(timesheet_ids)?;
        let timesheets = self.load_batch(ctx, &ids, TimesheetStatus::Submitted).await?;
        self.validate_lesson_statuses(ctx, &timesheets).await?;

        let mut seen = AHashSet::new();
        let lesson_ids: Vec<String> = timesheets
            .iter()
            .flat_map(Timesheet::lesson_ids)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let lock = LessonLockEvent { lesson_ids };

        ctx.ensure_active()?;
        self.writer
            .approve_with_lock(ctx, &ids, &lock, Arc::clone(&self.lesson_locks))
            .await?;
        info!(count = ids.len(), locked_lessons = lock.lesson_ids.len(), "Approved timesheets");

        self.action_logs
            .emit(ctx, ids.iter().map(String::as_str), TimesheetAction::Approved, false)
            .await?;
        Ok(())
    }

    /// Return an approved timesheet to submitted.
    #[instrument(skip(self, ctx))]
    pub async fn cancel_approve(&self, ctx: &OperationContext, timesheet_id: &str) -> Result<()> {
        ensure_elevated(ctx.requester())?;
        let timesheet = self.load(ctx, timesheet_id, TimesheetLoadOptions::NONE).await?;
        expect_status(&timesheet, TimesheetStatus::Approved)?;

        self.transition(
            ctx,
            &[timesheet.id],
            TimesheetStatus::Approved,
            TimesheetStatus::Submitted,
            TimesheetAction::CancelledApprove,
        )
        .await
    }

    /// Confirm a batch of approved timesheets.
    #[instrument(skip(self, ctx), fields(count = timesheet_ids.len()))]
    pub async fn confirm(&self, ctx: &OperationContext, timesheet_ids: &[String]) -> Result<()> {
        ensure_elevated(ctx.requester())?;
        let ids = requested_ids(timesheet_ids)?;
        self.load_batch(ctx, &ids, TimesheetStatus::Approved).await?;

        self.transition(
            ctx,
            &ids,
            TimesheetStatus::Approved,
            TimesheetStatus::Confirmed,
            TimesheetAction::Confirmed,
        )
        .await
    }

    /// Return a submitted timesheet to draft.
    #[instrument(skip(self, ctx))]
    pub async fn cancel_submission(&self, ctx: &OperationContext, timesheet_id: &str) -> Result<()> {
        let timesheet = self.load(ctx, timesheet_id, TimesheetLoadOptions::NONE).await?;
        ensure_owner_or_elevated(ctx.requester(), &timesheet)?;
        expect_status(&timesheet, TimesheetStatus::Submitted)?;

        self.transition(
            ctx,
            &[timesheet.id],
            TimesheetStatus::Submitted,
            TimesheetStatus::Draft,
            TimesheetAction::CancelledSubmission,
        )
        .await
    }

    async fn transition(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        from: TimesheetStatus,
        to: TimesheetStatus,
        action: TimesheetAction,
    ) -> Result<()> {
        ctx.ensure_active()?;
        self.writer.transition_status(ctx, ids, from, to).await?;
        info!(count = ids.len(), %from, %to, "Timesheet status changed");

        self.action_logs.emit(ctx, ids.iter().map(String::as_str), action, false).await?;
        Ok(())
    }

    async fn load(
        &self,
        ctx: &OperationContext,
        timesheet_id: &str,
        options: TimesheetLoadOptions,
    ) -> Result<Timesheet> {
        self.timesheets
            .find_by_id(ctx, timesheet_id, options)
            .await?
            .ok_or_else(|| TimesheetError::NotFound(format!("timesheet {timesheet_id}")))
    }

    /// Load every ID in `status`; a short read is an internal conflict.
    async fn load_batch(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        status: TimesheetStatus,
    ) -> Result<Vec<Timesheet>> {
        let found = self
            .timesheets
            .find_by_ids_with_status(ctx, ids, status, TimesheetLoadOptions::LESSON_HOURS)
            .await?;
        if found.len() != ids.len() {
            return Err(TimesheetError::Conflict(format!(
                "found {} of {} requested timesheets in {status} status",
                found.len(),
                ids.len()
            )));
        }
        Ok(found)
    }

    /// Every flagged lesson must be completed or canceled.
    async fn validate_lesson_statuses(
        &self,
        ctx: &OperationContext,
        timesheets: &[Timesheet],
    ) -> Result<()> {
        let flagged: Vec<String> = timesheets.iter().flat_map(Timesheet::flagged_lesson_ids).collect();
        if flagged.is_empty() {
            return Ok(());
        }

        let lessons = self.lessons.find_by_ids(ctx, &flagged).await?;
        for lesson_id in &flagged {
            match lessons.iter().find(|lesson| &lesson.lesson_id == lesson_id) {
                Some(lesson) if lesson.scheduling_status.is_settled() => {}
                Some(lesson) => {
                    return Err(TimesheetError::FailedPrecondition(format!(
                        "invalid lesson status: lesson {lesson_id} is {}",
                        lesson.scheduling_status
                    )))
                }
                None => {
                    return Err(TimesheetError::FailedPrecondition(format!(
                        "invalid lesson status: lesson {lesson_id} not found"
                    )))
                }
            }
        }
        Ok(())
    }
}

fn expect_status(timesheet: &Timesheet, expected: TimesheetStatus) -> Result<()> {
    if timesheet.status == expected {
        Ok(())
    } else {
        Err(TimesheetError::FailedPrecondition(format!(
            "timesheet {} should be in {expected} status, got {}",
            timesheet.id, timesheet.status
        )))
    }
}

/// Repeated IDs are kept so the batch count check sees them.
fn requested_ids(ids: &[String]) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Err(TimesheetError::InvalidArgument("timesheet ids must not be empty".to_string()));
    }
    Ok(ids.to_vec())
}
