//! Timesheet builder
//!
//! Given one lesson placed at a location and business date, decides for
//! each teaching staff whether to create a new draft timesheet or extend
//! the existing one, and which auto-create flag the new lesson-hours entry
//! carries.
//!
//! The assembly step is pure; the service wrapper only loads what it needs
//! (existing timesheets, preference history, partner default).

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use timesheet_domain::constants::DEFAULT_PARTNER_AUTO_CREATE_FLAG;
use timesheet_domain::{AutoCreateFlagResolver, BusinessCalendar, Lesson, Result, Timesheet};
use tracing::debug;

use super::ports::{AutoCreateFlagLogReader, PartnerSettingsReader};
use crate::context::OperationContext;
use crate::timesheet::ports::{TimesheetLoadOptions, TimesheetLookup, TimesheetReader};

/// A lesson pinned to one location and business date for a set of staff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPlacement {
    pub lesson_id: String,
    pub location_id: String,
    /// Reference time for auto-create flag resolution.
    pub start_time: DateTime<Utc>,
    /// Business-calendar date of `start_time`.
    pub date: NaiveDate,
    /// Staff this placement applies to; may be a subset of the teachers.
    pub staff_ids: Vec<String>,
}

impl LessonPlacement {
    /// Placement covering every teacher of `lesson`.
    #[must_use]
    pub fn from_lesson(lesson: &Lesson, calendar: &BusinessCalendar) -> Self {
        Self {
            lesson_id: lesson.lesson_id.clone(),
            location_id: lesson.location_id.clone(),
            start_time: lesson.start_time,
            date: calendar.date_of(lesson.start_time),
            staff_ids: lesson.teacher_ids.clone(),
        }
    }

    /// Same placement restricted to `staff_ids`.
    #[must_use]
    pub fn with_staff(mut self, staff_ids: Vec<String>) -> Self {
        self.staff_ids = staff_ids;
        self
    }

    /// Query for the live timesheets of these staff at this location and date.
    #[must_use]
    pub fn lookup(&self) -> TimesheetLookup {
        TimesheetLookup {
            staff_ids: self.staff_ids.clone(),
            location_id: self.location_id.clone(),
            date: self.date,
        }
    }
}

/// Create or extend timesheets for `placement`.
///
/// Returns only timesheets that gained a lesson-hours entry, restricted to
/// statuses reconciliation may touch and dates inside the valid range.
/// Staff already linked to the lesson are left alone, so a repeated build
/// over its own output adds nothing.
#[must_use]
pub fn assemble_timesheets(
    placement: &LessonPlacement,
    existing: &[Timesheet],
    resolver: &AutoCreateFlagResolver,
) -> Vec<Timesheet> {
    let mut built: Vec<Timesheet> = Vec::with_capacity(placement.staff_ids.len());

    for staff_id in &placement.staff_ids {
        if built.iter().any(|ts| &ts.staff_id == staff_id) {
            continue;
        }
        let flag_on = resolver.resolve(staff_id);
        let current = existing.iter().find(|ts| {
            &ts.staff_id == staff_id
                && ts.location_id == placement.location_id
                && ts.date == placement.date
        });

        let mut timesheet = match current {
            Some(found) => found.clone(),
            None => Timesheet::new_draft(staff_id.clone(), placement.location_id.clone(), placement.date),
        };
        if timesheet.add_lesson_hours(&placement.lesson_id, flag_on) {
            built.push(timesheet);
        }
    }

    built.retain(|ts| ts.status.accepts_lesson_changes() && ts.is_within_valid_range());
    built
}

/// Loads builder inputs and assembles timesheets
#[derive(Clone)]
pub struct TimesheetBuilder {
    timesheets: Arc<dyn TimesheetReader>,
    flag_logs: Arc<dyn AutoCreateFlagLogReader>,
    partner_settings: Arc<dyn PartnerSettingsReader>,
}

impl TimesheetBuilder {
    pub fn new(
        timesheets: Arc<dyn TimesheetReader>,
        flag_logs: Arc<dyn AutoCreateFlagLogReader>,
        partner_settings: Arc<dyn PartnerSettingsReader>,
    ) -> Self {
        Self { timesheets, flag_logs, partner_settings }
    }

    /// Partner-wide default; read once per request.
    pub async fn partner_default(&self, ctx: &OperationContext) -> Result<bool> {
        Ok(self
            .partner_settings
            .partner_auto_create_flag(ctx)
            .await?
            .unwrap_or(DEFAULT_PARTNER_AUTO_CREATE_FLAG))
    }

    /// Eligibility resolver for `staff_ids` as of `at`.
    pub async fn resolver(
        &self,
        ctx: &OperationContext,
        staff_ids: &[String],
        at: DateTime<Utc>,
        partner_default: bool,
    ) -> Result<AutoCreateFlagResolver> {
        let logs = self.flag_logs.find_latest_by_staff(ctx, staff_ids, at).await?;
        Ok(AutoCreateFlagResolver::new(&logs, at, partner_default))
    }

    /// Load existing timesheets and history, then assemble.
    pub async fn build(
        &self,
        ctx: &OperationContext,
        placement: &LessonPlacement,
        partner_default: bool,
    ) -> Result<Vec<Timesheet>> {
        if placement.staff_ids.is_empty() {
            return Ok(Vec::new());
        }

        let existing = self
            .timesheets
            .find_by_lookup(ctx, &placement.lookup(), TimesheetLoadOptions::LESSON_HOURS)
            .await?;
        ctx.ensure_active()?;
        let resolver =
            self.resolver(ctx, &placement.staff_ids, placement.start_time, partner_default).await?;

        let built = assemble_timesheets(placement, &existing, &resolver);
        debug!(
            lesson_id = %placement.lesson_id,
            existing = existing.len(),
            built = built.len(),
            "Assembled timesheets for lesson"
        );
        Ok(built)
    }
}
