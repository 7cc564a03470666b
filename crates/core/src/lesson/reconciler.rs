//! Lesson event reconciler
//!
//! Translates lesson lifecycle events into timesheet changes. Each
//! remove/add step checks the confirmation window for its side, loads the
//! affected timesheets, strips or builds lesson-hours, then persists both
//! sides in one transaction before any action log is published.

use std::sync::Arc;

use ahash::AHashMap;
use timesheet_domain::{
    merge_timesheet_lists, BusinessCalendar, LessonCreated, LessonDeleted, LessonEvent,
    LessonUpdateKind, LessonUpdated, Result, Timesheet, TimesheetAction,
};
use tracing::{debug, info, instrument, warn};

use super::builder::{LessonPlacement, TimesheetBuilder};
use super::ports::StaffTransportationExpenseReader;
use crate::audit::{ActionLogEmitter, ActionLogPublisher};
use crate::context::OperationContext;
use crate::ids::new_id;
use crate::timesheet::ports::{
    ConfirmationWindow, LessonHoursFlagUpdate, ReconciliationWriter, TimesheetChangeSet,
    TimesheetLoadOptions, TimesheetReader,
};

/// Counts describing what one event changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Timesheets inserted or extended.
    pub upserted: usize,
    /// Timesheets that lost lesson-hours (deleted or not).
    pub removed: usize,
    /// Timesheets whose lesson-hours flag was refreshed.
    pub flag_refreshed: usize,
    /// Action logs published for timesheets that already existed.
    pub logged: usize,
}

impl ReconcileOutcome {
    fn absorb(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.removed += other.removed;
        self.flag_refreshed += other.flag_refreshed;
        self.logged += other.logged;
    }

    /// Nothing was written; `logged` is implied zero.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.upserted == 0 && self.removed == 0 && self.flag_refreshed == 0
    }
}

/// Lesson event reconciler service
pub struct LessonEventReconciler {
    timesheets: Arc<dyn TimesheetReader>,
    writer: Arc<dyn ReconciliationWriter>,
    confirmation: Arc<dyn ConfirmationWindow>,
    staff_expenses: Arc<dyn StaffTransportationExpenseReader>,
    builder: TimesheetBuilder,
    action_logs: ActionLogEmitter,
    calendar: BusinessCalendar,
}

impl LessonEventReconciler {
    /// Action logs go through `publisher`; dates use the default business calendar.
    pub fn new(
        timesheets: Arc<dyn TimesheetReader>,
        writer: Arc<dyn ReconciliationWriter>,
        confirmation: Arc<dyn ConfirmationWindow>,
        staff_expenses: Arc<dyn StaffTransportationExpenseReader>,
        builder: TimesheetBuilder,
        publisher: Arc<dyn ActionLogPublisher>,
    ) -> Self {
        Self {
            timesheets,
            writer,
            confirmation,
            staff_expenses,
            builder,
            action_logs: ActionLogEmitter::new(publisher),
            calendar: BusinessCalendar::default(),
        }
    }

    /// Use a non-default business calendar
    #[must_use]
    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Dispatch any lesson event
    pub async fn handle(&self, ctx: &OperationContext, event: &LessonEvent) -> Result<ReconcileOutcome> {
        match event {
            LessonEvent::Created(created) => self.handle_created(ctx, created).await,
            LessonEvent::Updated(updated) => self.handle_updated(ctx, updated).await,
            LessonEvent::Deleted(deleted) => self.handle_deleted(ctx, deleted).await,
        }
    }

    /// Create or extend timesheets for newly published lessons
    #[instrument(skip(self, ctx, event), fields(lessons = event.lessons.len()))]
    pub async fn handle_created(
        &self,
        ctx: &OperationContext,
        event: &LessonCreated,
    ) -> Result<ReconcileOutcome> {
        let eligible: Vec<_> = event
            .lessons
            .iter()
            .filter(|lesson| {
                let eligible = lesson.is_eligible_for_timesheet();
                if !eligible {
                    warn!(
                        lesson_id = %lesson.lesson_id,
                        status = %lesson.scheduling_status,
                        teachers = lesson.teacher_ids.len(),
                        "Skipping lesson not eligible for timesheet"
                    );
                }
                eligible
            })
            .collect();
        if eligible.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let partner_default = self.builder.partner_default(ctx).await?;
        let mut accumulated = Vec::new();
        for lesson in eligible {
            ctx.ensure_active()?;
            let placement = LessonPlacement::from_lesson(lesson, &self.calendar);
            if self.is_locked(ctx, &placement).await? {
                continue;
            }
            let built = self.builder.build(ctx, &placement, partner_default).await?;
            accumulated = merge_timesheet_lists(accumulated, built)?;
        }

        self.persist(ctx, accumulated, Vec::new()).await
    }

    /// Apply every category of a lesson update in order
    #[instrument(skip(self, ctx, event), fields(lesson_id = %event.lesson_id()))]
    pub async fn handle_updated(
        &self,
        ctx: &OperationContext,
        event: &LessonUpdated,
    ) -> Result<ReconcileOutcome> {
        let kinds = event.classify(&self.calendar);
        if kinds.is_empty() {
            debug!("Lesson update does not affect timesheets");
            return Ok(ReconcileOutcome::default());
        }

        let partner_default = self.builder.partner_default(ctx).await?;
        let before = LessonPlacement::from_lesson(&event.before, &self.calendar);
        let after = LessonPlacement::from_lesson(&event.after, &self.calendar);
        let mut outcome = ReconcileOutcome::default();

        for kind in kinds {
            ctx.ensure_active()?;
            debug!(?kind, "Reconciling lesson update");
            let step = match kind {
                LessonUpdateKind::PublishedToDraft => {
                    self.reconcile_sides(ctx, Some(&before), None, partner_default).await?
                }
                LessonUpdateKind::DraftToPublished => {
                    self.reconcile_sides(ctx, None, Some(&after), partner_default).await?
                }
                LessonUpdateKind::TeachersChanged { added, removed } => {
                    let removal = before.clone().with_staff(removed);
                    let addition = after.clone().with_staff(added);
                    self.reconcile_sides(ctx, Some(&removal), Some(&addition), partner_default)
                        .await?
                }
                LessonUpdateKind::DateChanged | LessonUpdateKind::LocationChanged => {
                    self.reconcile_sides(ctx, Some(&before), Some(&after), partner_default).await?
                }
                LessonUpdateKind::StartTimeChanged => {
                    self.refresh_flags(ctx, &after, partner_default).await?
                }
            };
            outcome.absorb(step);
        }
        Ok(outcome)
    }

    /// Strip deleted lessons from their timesheets
    #[instrument(skip(self, ctx, event), fields(lessons = event.lesson_ids.len()))]
    pub async fn handle_deleted(
        &self,
        ctx: &OperationContext,
        event: &LessonDeleted,
    ) -> Result<ReconcileOutcome> {
        if event.lesson_ids.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let owning = self.timesheets.find_by_lesson_ids(ctx, &event.lesson_ids).await?;
        let mut removals = Vec::with_capacity(owning.len());
        for mut timesheet in owning {
            ctx.ensure_active()?;
            if !timesheet.status.accepts_lesson_changes() {
                debug!(timesheet_id = %timesheet.id, status = %timesheet.status, "Timesheet no longer accepts lesson changes");
                continue;
            }
            if self
                .confirmation
                .is_period_locked(ctx, timesheet.date, &timesheet.location_id)
                .await?
            {
                warn!(timesheet_id = %timesheet.id, date = %timesheet.date, "Timesheet period locked, keeping lesson hours");
                continue;
            }
            let mut changed = false;
            for lesson_id in &event.lesson_ids {
                changed |= timesheet.strip_lesson(lesson_id);
            }
            if changed {
                removals.push(timesheet);
            }
        }

        self.persist(ctx, Vec::new(), removals).await
    }

    /// Remove the lesson on the `removal` side and build it on the
    /// `addition` side, then persist both together.
    async fn reconcile_sides(
        &self,
        ctx: &OperationContext,
        removal: Option<&LessonPlacement>,
        addition: Option<&LessonPlacement>,
        partner_default: bool,
    ) -> Result<ReconcileOutcome> {
        let mut removals = Vec::new();
        if let Some(side) = removal.filter(|side| !side.staff_ids.is_empty()) {
            if !self.is_locked(ctx, side).await? {
                removals = self.strip_side(ctx, side).await?;
            }
        }

        let mut upserts = Vec::new();
        if let Some(side) = addition.filter(|side| !side.staff_ids.is_empty()) {
            if !self.is_locked(ctx, side).await? {
                upserts = self.builder.build(ctx, side, partner_default).await?;
            }
        }

        self.persist(ctx, upserts, removals).await
    }

    async fn strip_side(&self, ctx: &OperationContext, side: &LessonPlacement) -> Result<Vec<Timesheet>> {
        // Staff entries must be loaded too, or stripping the last lesson
        // would look like emptying the timesheet.
        let loaded = self
            .timesheets
            .find_by_lookup(ctx, &side.lookup(), TimesheetLoadOptions::ALL)
            .await?;
        Ok(loaded
            .into_iter()
            .filter(|ts| ts.status.accepts_lesson_changes())
            .filter_map(|mut ts| ts.strip_lesson(&side.lesson_id).then_some(ts))
            .collect())
    }

    /// Recompute the auto-create flag of every lesson-hours entry the
    /// affected staff hold at the lesson's new time
    async fn refresh_flags(
        &self,
        ctx: &OperationContext,
        side: &LessonPlacement,
        partner_default: bool,
    ) -> Result<ReconcileOutcome> {
        if side.staff_ids.is_empty() || self.is_locked(ctx, side).await? {
            return Ok(ReconcileOutcome::default());
        }

        let loaded = self
            .timesheets
            .find_by_lookup(ctx, &side.lookup(), TimesheetLoadOptions::LESSON_HOURS)
            .await?;
        let resolver =
            self.builder.resolver(ctx, &side.staff_ids, side.start_time, partner_default).await?;

        let mut groups: AHashMap<bool, Vec<String>> = AHashMap::new();
        for timesheet in loaded.iter().filter(|ts| ts.status.accepts_lesson_changes()) {
            groups
                .entry(resolver.resolve(&timesheet.staff_id))
                .or_default()
                .push(timesheet.id.clone());
        }
        if groups.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let mut updates: Vec<LessonHoursFlagUpdate> = groups
            .into_iter()
            .map(|(flag_on, timesheet_ids)| LessonHoursFlagUpdate { flag_on, timesheet_ids })
            .collect();
        updates.sort_by_key(|update| !update.flag_on);
        let refreshed = updates.iter().map(|u| u.timesheet_ids.len()).sum();

        self.writer.update_lesson_hours_flags(ctx, &updates).await?;
        info!(lesson_id = %side.lesson_id, refreshed, "Refreshed lesson hours auto-create flags");
        Ok(ReconcileOutcome { flag_refreshed: refreshed, ..ReconcileOutcome::default() })
    }

    async fn is_locked(&self, ctx: &OperationContext, side: &LessonPlacement) -> Result<bool> {
        let locked = self.confirmation.is_period_locked(ctx, side.date, &side.location_id).await?;
        if locked {
            warn!(
                lesson_id = %side.lesson_id,
                location_id = %side.location_id,
                date = %side.date,
                "Confirmation period locked, skipping"
            );
        }
        Ok(locked)
    }

    /// Write one change set, then log every already-saved survivor.
    async fn persist(
        &self,
        ctx: &OperationContext,
        mut upserts: Vec<Timesheet>,
        removals: Vec<Timesheet>,
    ) -> Result<ReconcileOutcome> {
        if upserts.is_empty() && removals.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        self.prepare_new_timesheets(ctx, &mut upserts).await?;
        let changes = TimesheetChangeSet { upserts, removals };
        ctx.ensure_active()?;
        self.writer.apply_changes(ctx, &changes).await?;

        let logged_ids: Vec<&str> = changes
            .upserts
            .iter()
            .chain(&changes.removals)
            .filter(|ts| ts.is_created && !ts.is_deleted)
            .map(|ts| ts.id.as_str())
            .collect();
        let logged =
            self.action_logs.emit(ctx, logged_ids, TimesheetAction::UpdatedLesson, true).await?;

        info!(
            upserted = changes.upserts.len(),
            removed = changes.removals.len(),
            logged,
            "Persisted timesheet reconciliation"
        );
        Ok(ReconcileOutcome {
            upserted: changes.upserts.len(),
            removed: changes.removals.len(),
            flag_refreshed: 0,
            logged,
        })
    }

    /// Assign IDs to unsaved timesheets and copy in staff default routes.
    async fn prepare_new_timesheets(
        &self,
        ctx: &OperationContext,
        upserts: &mut [Timesheet],
    ) -> Result<()> {
        let keys: Vec<(String, String)> = upserts
            .iter()
            .filter(|ts| !ts.is_created)
            .map(|ts| (ts.staff_id.clone(), ts.location_id.clone()))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let defaults = self.staff_expenses.find_by_staff_and_location(ctx, &keys).await?;
        for timesheet in upserts.iter_mut().filter(|ts| !ts.is_created) {
            timesheet.assign_id(new_id());
            let copied: Vec<_> = defaults
                .iter()
                .filter(|d| d.staff_id == timesheet.staff_id && d.location_id == timesheet.location_id)
                .map(|d| {
                    let mut expense = d.to_expense(&timesheet.id);
                    expense.id = new_id();
                    expense
                })
                .collect();
            timesheet.transportation_expenses.extend(copied);
        }
        Ok(())
    }
}
