//! In-memory repository implementations for testing
//!
//! `MockTimesheetStore` implements every timesheet read and write port over
//! a shared vector. Each write works on a copy and swaps it in at the end,
//! so a failed or cancelled write leaves no trace, like a rolled-back
//! transaction. Soft-deleted rows stay in the vector with `is_deleted` set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use timesheet_core::{
    into_publish_error, AutoCreateFlagLogReader, ConfirmationWindow, LessonHoursFlagUpdate,
    LessonLockPublisher, LessonReader, LifecycleWriter, OperationContext, PartnerSettingsReader,
    ReconciliationWriter, StaffTransportationExpenseReader, TimesheetChangeSet,
    TimesheetCommandWriter, TimesheetLoadOptions, TimesheetLookup, TimesheetReader,
};
use timesheet_domain::{
    AutoCreateFlagActivityLog, ConfirmationPeriod, Lesson, LessonLockEvent, Result as DomainResult,
    StaffTransportationExpense, Timesheet, TimesheetError, TimesheetStatus,
};

/// In-memory mock for all timesheet persistence ports.
#[derive(Default, Clone)]
pub struct MockTimesheetStore {
    rows: Arc<Mutex<Vec<Timesheet>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<Mutex<usize>>,
}

impl MockTimesheetStore {
    /// Create a new store seeded with saved timesheets.
    pub fn new(timesheets: Vec<Timesheet>) -> Self {
        let store = Self::default();
        *store.rows.lock() = timesheets;
        store
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// All rows including soft-deleted ones.
    pub fn all(&self) -> Vec<Timesheet> {
        self.rows.lock().clone()
    }

    /// Live rows only, entries untouched.
    pub fn live(&self) -> Vec<Timesheet> {
        self.all().into_iter().filter(|ts| !ts.is_deleted).collect()
    }

    pub fn get(&self, id: &str) -> Option<Timesheet> {
        self.all().into_iter().find(|ts| ts.id == id)
    }

    pub fn live_for_staff(&self, staff_id: &str) -> Vec<Timesheet> {
        self.live().into_iter().filter(|ts| ts.staff_id == staff_id).collect()
    }

    /// Number of committed write transactions.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    fn read<F>(&self, options: TimesheetLoadOptions, predicate: F) -> Vec<Timesheet>
    where
        F: Fn(&Timesheet) -> bool,
    {
        self.rows
            .lock()
            .iter()
            .filter(|ts| !ts.is_deleted && predicate(ts))
            .map(|ts| as_loaded(ts, options))
            .collect()
    }

    /// Run `mutate` on a copy and commit it when it succeeds.
    fn transaction<F>(&self, ctx: &OperationContext, mutate: F) -> DomainResult<()>
    where
        F: FnOnce(&mut Vec<Timesheet>) -> DomainResult<()>,
    {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TimesheetError::Database("connection refused".to_string()));
        }
        let mut rows = self.rows.lock();
        let mut working = rows.clone();
        mutate(&mut working)?;
        ctx.ensure_active()?;
        *rows = working;
        *self.writes.lock() += 1;
        Ok(())
    }
}

fn as_loaded(stored: &Timesheet, options: TimesheetLoadOptions) -> Timesheet {
    let mut ts = stored.clone();
    ts.is_created = true;
    ts.lesson_hours = if options.lesson_hours {
        stored
            .lesson_hours
            .iter()
            .filter(|lh| !lh.is_deleted)
            .cloned()
            .map(|mut lh| {
                lh.is_created = true;
                lh
            })
            .collect()
    } else {
        Vec::new()
    };
    ts.other_working_hours = if options.other_working_hours {
        stored.other_working_hours.iter().filter(|o| !o.is_deleted).cloned().collect()
    } else {
        Vec::new()
    };
    ts.transportation_expenses = if options.transportation_expenses {
        stored.transportation_expenses.iter().filter(|t| !t.is_deleted).cloned().collect()
    } else {
        Vec::new()
    };
    ts
}

fn find_live<'a>(rows: &'a mut [Timesheet], id: &str) -> DomainResult<&'a mut Timesheet> {
    rows.iter_mut()
        .find(|ts| ts.id == id && !ts.is_deleted)
        .ok_or_else(|| TimesheetError::NotFound(format!("timesheet {id}")))
}

fn insert_new(rows: &mut Vec<Timesheet>, timesheet: &Timesheet) -> DomainResult<()> {
    if timesheet.id.is_empty() {
        return Err(TimesheetError::Internal("timesheet id must be assigned".to_string()));
    }
    if rows.iter().any(|ts| !ts.is_deleted && ts.key() == timesheet.key()) {
        return Err(TimesheetError::AlreadyExists(format!("timesheet key {:?}", timesheet.key())));
    }
    let mut stored = timesheet.clone();
    stored.is_created = true;
    stored.is_deleted = false;
    rows.push(stored);
    Ok(())
}

#[async_trait]
impl TimesheetReader for MockTimesheetStore {
    async fn find_by_id(
        &self,
        _ctx: &OperationContext,
        id: &str,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Option<Timesheet>> {
        Ok(self.read(options, |ts| ts.id == id).into_iter().next())
    }

    async fn find_by_ids_with_status(
        &self,
        _ctx: &OperationContext,
        ids: &[String],
        status: TimesheetStatus,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Vec<Timesheet>> {
        Ok(self.read(options, |ts| ts.status == status && ids.contains(&ts.id)))
    }

    async fn find_by_lookup(
        &self,
        _ctx: &OperationContext,
        lookup: &TimesheetLookup,
        options: TimesheetLoadOptions,
    ) -> DomainResult<Vec<Timesheet>> {
        Ok(self.read(options, |ts| {
            lookup.staff_ids.contains(&ts.staff_id)
                && ts.location_id == lookup.location_id
                && ts.date == lookup.date
        }))
    }

    async fn find_by_lesson_ids(
        &self,
        _ctx: &OperationContext,
        lesson_ids: &[String],
    ) -> DomainResult<Vec<Timesheet>> {
        Ok(self.read(TimesheetLoadOptions::ALL, |ts| {
            ts.lesson_hours.iter().any(|lh| !lh.is_deleted && lesson_ids.contains(&lh.lesson_id))
        }))
    }
}

#[async_trait]
impl ReconciliationWriter for MockTimesheetStore {
    async fn apply_changes(
        &self,
        ctx: &OperationContext,
        changes: &TimesheetChangeSet,
    ) -> DomainResult<()> {
        self.transaction(ctx, |rows| {
            for upsert in &changes.upserts {
                if !upsert.is_created {
                    insert_new(rows, upsert)?;
                    continue;
                }
                let stored = find_live(rows, &upsert.id)?;
                for lh in upsert.lesson_hours.iter().filter(|lh| !lh.is_created && !lh.is_deleted) {
                    let mut added = lh.clone();
                    added.timesheet_id.clone_from(&upsert.id);
                    stored.lesson_hours.push(added);
                }
            }
            for removal in &changes.removals {
                let stored = find_live(rows, &removal.id)?;
                for lh in removal.lesson_hours.iter().filter(|lh| lh.is_deleted) {
                    for existing in
                        stored.lesson_hours.iter_mut().filter(|s| s.lesson_id == lh.lesson_id)
                    {
                        existing.is_deleted = true;
                    }
                }
                if removal.is_deleted {
                    stored.is_deleted = true;
                }
            }
            Ok(())
        })
    }

    async fn update_lesson_hours_flags(
        &self,
        ctx: &OperationContext,
        updates: &[LessonHoursFlagUpdate],
    ) -> DomainResult<()> {
        self.transaction(ctx, |rows| {
            for update in updates {
                for ts in rows.iter_mut().filter(|ts| update.timesheet_ids.contains(&ts.id)) {
                    for lh in ts.lesson_hours.iter_mut().filter(|lh| !lh.is_deleted) {
                        lh.flag_on = update.flag_on;
                    }
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl TimesheetCommandWriter for MockTimesheetStore {
    async fn insert_timesheet(&self, ctx: &OperationContext, timesheet: &Timesheet) -> DomainResult<()> {
        self.transaction(ctx, |rows| insert_new(rows, timesheet))
    }

    async fn save_details(&self, ctx: &OperationContext, timesheet: &Timesheet) -> DomainResult<()> {
        self.transaction(ctx, |rows| {
            let stored = find_live(rows, &timesheet.id)?;
            stored.remark.clone_from(&timesheet.remark);
            for owh in &timesheet.other_working_hours {
                match stored.other_working_hours.iter_mut().find(|o| o.id == owh.id) {
                    Some(slot) => *slot = owh.clone(),
                    None => stored.other_working_hours.push(owh.clone()),
                }
            }
            for expense in &timesheet.transportation_expenses {
                match stored.transportation_expenses.iter_mut().find(|t| t.id == expense.id) {
                    Some(slot) => *slot = expense.clone(),
                    None => stored.transportation_expenses.push(expense.clone()),
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl LifecycleWriter for MockTimesheetStore {
    async fn soft_delete(
        &self,
        ctx: &OperationContext,
        timesheet_id: &str,
        delete_timesheet: bool,
    ) -> DomainResult<()> {
        self.transaction(ctx, |rows| {
            let stored = find_live(rows, timesheet_id)?;
            stored.other_working_hours.iter_mut().for_each(|o| o.is_deleted = true);
            stored.transportation_expenses.iter_mut().for_each(|t| t.is_deleted = true);
            if delete_timesheet {
                stored.lesson_hours.iter_mut().for_each(|lh| lh.is_deleted = true);
                stored.is_deleted = true;
            }
            Ok(())
        })
    }

    async fn transition_status(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        from: TimesheetStatus,
        to: TimesheetStatus,
    ) -> DomainResult<()> {
        self.transaction(ctx, |rows| apply_transition(rows, ids, from, to))
    }

    async fn approve_with_lock(
        &self,
        ctx: &OperationContext,
        ids: &[String],
        lock: &LessonLockEvent,
        publisher: Arc<dyn LessonLockPublisher>,
    ) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TimesheetError::Database("connection refused".to_string()));
        }
        let mut working = self.rows.lock().clone();
        apply_transition(&mut working, ids, TimesheetStatus::Submitted, TimesheetStatus::Approved)?;
        ctx.ensure_active()?;
        if !lock.lesson_ids.is_empty() {
            publisher.publish_lesson_lock(ctx, lock).await.map_err(into_publish_error)?;
        }
        *self.rows.lock() = working;
        *self.writes.lock() += 1;
        Ok(())
    }
}

fn apply_transition(
    rows: &mut [Timesheet],
    ids: &[String],
    from: TimesheetStatus,
    to: TimesheetStatus,
) -> DomainResult<()> {
    for id in ids {
        let stored = find_live(rows, id)?;
        if stored.status != from {
            return Err(TimesheetError::Conflict(format!("timesheet {id} is not {from}")));
        }
        stored.status = to;
    }
    Ok(())
}

/// Scripted confirmation window: locked `(date, location)` pairs.
#[derive(Default, Clone)]
pub struct MockConfirmationWindow {
    locked: Arc<Mutex<Vec<(NaiveDate, String)>>>,
}

impl MockConfirmationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locked(self, date: NaiveDate, location_id: &str) -> Self {
        self.locked.lock().push((date, location_id.to_string()));
        self
    }
}

#[async_trait]
impl ConfirmationWindow for MockConfirmationWindow {
    async fn confirmation_period(
        &self,
        _ctx: &OperationContext,
        date: NaiveDate,
    ) -> DomainResult<Option<ConfirmationPeriod>> {
        Ok(Some(ConfirmationPeriod { id: "period-1".to_string(), start_date: date, end_date: date }))
    }

    async fn is_period_locked(
        &self,
        _ctx: &OperationContext,
        date: NaiveDate,
        location_id: &str,
    ) -> DomainResult<bool> {
        Ok(self.locked.lock().iter().any(|(d, l)| *d == date && l == location_id))
    }
}

/// In-memory mock for `LessonReader`.
#[derive(Default, Clone)]
pub struct MockLessonRepository {
    lessons: Arc<Mutex<Vec<Lesson>>>,
}

impl MockLessonRepository {
    pub fn new(lessons: Vec<Lesson>) -> Self {
        Self { lessons: Arc::new(Mutex::new(lessons)) }
    }
}

#[async_trait]
impl LessonReader for MockLessonRepository {
    async fn find_by_ids(&self, _ctx: &OperationContext, lesson_ids: &[String]) -> DomainResult<Vec<Lesson>> {
        Ok(self
            .lessons
            .lock()
            .iter()
            .filter(|lesson| lesson_ids.contains(&lesson.lesson_id))
            .cloned()
            .collect())
    }
}

/// In-memory mock for preference history and the partner default.
#[derive(Default, Clone)]
pub struct MockAutoCreateSettings {
    logs: Arc<Mutex<Vec<AutoCreateFlagActivityLog>>>,
    partner_default: Option<bool>,
}

impl MockAutoCreateSettings {
    pub fn new(logs: Vec<AutoCreateFlagActivityLog>, partner_default: Option<bool>) -> Self {
        Self { logs: Arc::new(Mutex::new(logs)), partner_default }
    }
}

#[async_trait]
impl AutoCreateFlagLogReader for MockAutoCreateSettings {
    async fn find_latest_by_staff(
        &self,
        _ctx: &OperationContext,
        staff_ids: &[String],
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<AutoCreateFlagActivityLog>> {
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|log| staff_ids.contains(&log.staff_id) && log.change_time <= at)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PartnerSettingsReader for MockAutoCreateSettings {
    async fn partner_auto_create_flag(&self, _ctx: &OperationContext) -> DomainResult<Option<bool>> {
        Ok(self.partner_default)
    }
}

/// In-memory mock for `StaffTransportationExpenseReader`.
#[derive(Default, Clone)]
pub struct MockStaffExpenseRepository {
    defaults: Arc<Vec<StaffTransportationExpense>>,
}

impl MockStaffExpenseRepository {
    pub fn new(defaults: Vec<StaffTransportationExpense>) -> Self {
        Self { defaults: Arc::new(defaults) }
    }
}

#[async_trait]
impl StaffTransportationExpenseReader for MockStaffExpenseRepository {
    async fn find_by_staff_and_location(
        &self,
        _ctx: &OperationContext,
        keys: &[(String, String)],
    ) -> DomainResult<Vec<StaffTransportationExpense>> {
        Ok(self
            .defaults
            .iter()
            .filter(|d| keys.iter().any(|(staff, location)| &d.staff_id == staff && &d.location_id == location))
            .cloned()
            .collect())
    }
}
