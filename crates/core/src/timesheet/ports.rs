//! Port interfaces for timesheet persistence
//!
//! Readers and writers are split per consumer: reconciliation, direct
//! edits and lifecycle transitions each depend only on the writes they
//! perform. Every write method is one transaction in the adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use timesheet_domain::{ConfirmationPeriod, LessonLockEvent, Result, Timesheet, TimesheetStatus};

use crate::audit::LessonLockPublisher;
use crate::context::OperationContext;

/// Owned collections to load alongside each timesheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimesheetLoadOptions {
    /// Load live lesson-hours.
    pub lesson_hours: bool,
    /// Load live other working hours.
    pub other_working_hours: bool,
    /// Load live transportation expenses.
    pub transportation_expenses: bool,
}

impl TimesheetLoadOptions {
    /// The timesheet row only.
    pub const NONE: Self =
        Self { lesson_hours: false, other_working_hours: false, transportation_expenses: false };
    /// Row plus lesson-hours.
    pub const LESSON_HOURS: Self =
        Self { lesson_hours: true, other_working_hours: false, transportation_expenses: false };
    /// Row plus every owned collection.
    pub const ALL: Self =
        Self { lesson_hours: true, other_working_hours: true, transportation_expenses: true };
}

/// Live timesheets of several staff at one location and date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimesheetLookup {
    pub staff_ids: Vec<String>,
    pub location_id: String,
    /// Business-calendar date.
    pub date: NaiveDate,
}

/// New flag for every live lesson-hours entry of a set of timesheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonHoursFlagUpdate {
    pub flag_on: bool,
    /// Timesheets whose live lesson-hours all take `flag_on`.
    pub timesheet_ids: Vec<String>,
}

/// Result of one reconciliation step, written in a single transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimesheetChangeSet {
    /// Unsaved timesheets are inserted with all their entries; saved ones
    /// only get their unsaved lesson-hours inserted.
    pub upserts: Vec<Timesheet>,
    /// Deleted lesson-hours are soft-deleted; timesheets flagged
    /// `is_deleted` are soft-deleted with them.
    pub removals: Vec<Timesheet>,
}

impl TimesheetChangeSet {
    /// Nothing to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// Read access to timesheet aggregates
///
/// Every returned timesheet and lesson-hours entry has `is_created` set.
#[async_trait]
pub trait TimesheetReader: Send + Sync {
    /// Find a live timesheet by ID
    async fn find_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        options: TimesheetLoadOptions,
    ) -> Result<Option<Timesheet>>;

    /// Live timesheets among `ids` currently in `status`
    async fn find_by_ids_with_status(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        status: TimesheetStatus,
        options: TimesheetLoadOptions,
    ) -> Result<Vec<Timesheet>>;

    /// Live timesheets matching a staff/location/date lookup
    async fn find_by_lookup(
        &self,
        ctx: &OperationContext,
        lookup: &TimesheetLookup,
        options: TimesheetLoadOptions,
    ) -> Result<Vec<Timesheet>>;

    /// Live timesheets holding live lesson-hours for any of `lesson_ids`,
    /// loaded with every owned collection
    async fn find_by_lesson_ids(
        &self,
        ctx: &OperationContext,
        lesson_ids: &[String],
    ) -> Result<Vec<Timesheet>>;
}

/// Writes produced by lesson reconciliation
#[async_trait]
pub trait ReconciliationWriter: Send + Sync {
    /// Persist upserts and removals atomically
    async fn apply_changes(&self, ctx: &OperationContext, changes: &TimesheetChangeSet)
        -> Result<()>;

    /// Set `flag_on` of every live lesson-hours entry in each group
    async fn update_lesson_hours_flags(
        &self,
        ctx: &OperationContext,
        updates: &[LessonHoursFlagUpdate],
    ) -> Result<()>;
}

/// Writes produced by staff direct edits
#[async_trait]
pub trait TimesheetCommandWriter: Send + Sync {
    /// Insert a new timesheet with its other working hours and expenses
    async fn insert_timesheet(&self, ctx: &OperationContext, timesheet: &Timesheet) -> Result<()>;

    /// Save the remark and upsert staff-entered entries; entries flagged
    /// `is_deleted` are soft-deleted
    async fn save_details(&self, ctx: &OperationContext, timesheet: &Timesheet) -> Result<()>;
}

/// Writes produced by lifecycle transitions
#[async_trait]
pub trait LifecycleWriter: Send + Sync {
    /// Soft-delete other working hours and expenses, then the timesheet
    /// itself when `delete_timesheet` is set
    async fn soft_delete(
        &self,
        ctx: &OperationContext,
        timesheet_id: &str,
        delete_timesheet: bool,
    ) -> Result<()>;

    /// Move every ID from `from` to `to`; all or nothing
    async fn transition_status(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        from: TimesheetStatus,
        to: TimesheetStatus,
    ) -> Result<()>;

    /// Move every ID from SUBMITTED to APPROVED and publish `lock` through
    /// `publisher` before the transaction commits.
    ///
    /// A failed publish rolls the transition back and is returned as
    /// [`TimesheetError::Publish`](timesheet_domain::TimesheetError::Publish).
    /// An empty `lock` is not published.
    async fn approve_with_lock(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        lock: &LessonLockEvent,
        publisher: Arc<dyn LessonLockPublisher>,
    ) -> Result<()>;
}

/// Confirmation window oracle
#[async_trait]
pub trait ConfirmationWindow: Send + Sync {
    /// Period containing `date`, if one is configured
    async fn confirmation_period(
        &self,
        ctx: &OperationContext,
        date: NaiveDate,
    ) -> Result<Option<ConfirmationPeriod>>;

    /// Whether timesheets at `location_id` on `date` are locked for edits
    async fn is_period_locked(
        &self,
        ctx: &OperationContext,
        date: NaiveDate,
        location_id: &str,
    ) -> Result<bool>;
}
