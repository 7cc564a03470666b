//! Timesheet aggregate
//!
//! One staff member's work record for one location and one business date.
//! The aggregate owns its lesson-hours, other working hours and
//! transportation expenses; `is_created`/`is_deleted` are reconciliation
//! markers and are never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entries::{LessonHours, OtherWorkingHours, TransportationExpense};
use crate::constants::MIN_TIMESHEET_DATE;
use crate::errors::{Result, TimesheetError};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Confirmed,
}

impl_domain_status_conversions!(TimesheetStatus {
    Draft => "TIMESHEET_STATUS_DRAFT",
    Submitted => "TIMESHEET_STATUS_SUBMITTED",
    Approved => "TIMESHEET_STATUS_APPROVED",
    Confirmed => "TIMESHEET_STATUS_CONFIRMED",
});

impl TimesheetStatus {
    /// Statuses lesson reconciliation may still modify.
    #[must_use]
    pub const fn accepts_lesson_changes(&self) -> bool {
        matches!(self, Self::Draft | Self::Submitted)
    }
}

/// Uniqueness key of a live timesheet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimesheetKey {
    pub staff_id: String,
    pub location_id: String,
    pub date: NaiveDate,
}

/// A staff member's working record for one location and day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timesheet {
    /// Empty until first persisted.
    pub id: String,
    pub staff_id: String,
    pub location_id: String,
    /// Business-local calendar date.
    pub date: NaiveDate,
    pub status: TimesheetStatus,
    pub remark: String,
    pub lesson_hours: Vec<LessonHours>,
    pub other_working_hours: Vec<OtherWorkingHours>,
    pub transportation_expenses: Vec<TransportationExpense>,
    /// Already present in storage.
    #[serde(skip)]
    pub is_created: bool,
    /// Marked for removal in the current reconciliation cycle.
    #[serde(skip)]
    pub is_deleted: bool,
}

impl Timesheet {
    /// Unsaved draft with no entries.
    #[must_use]
    pub fn new_draft(
        staff_id: impl Into<String>,
        location_id: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: String::new(),
            staff_id: staff_id.into(),
            location_id: location_id.into(),
            date,
            status: TimesheetStatus::Draft,
            remark: String::new(),
            lesson_hours: Vec::new(),
            other_working_hours: Vec::new(),
            transportation_expenses: Vec::new(),
            is_created: false,
            is_deleted: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> TimesheetKey {
        TimesheetKey {
            staff_id: self.staff_id.clone(),
            location_id: self.location_id.clone(),
            date: self.date,
        }
    }

    pub fn live_lesson_hours(&self) -> impl Iterator<Item = &LessonHours> {
        self.lesson_hours.iter().filter(|lh| lh.is_live())
    }

    #[must_use]
    pub fn has_lesson(&self, lesson_id: &str) -> bool {
        self.live_lesson_hours().any(|lh| lh.lesson_id == lesson_id)
    }

    /// IDs of lessons whose hours count toward auto-creation.
    #[must_use]
    pub fn flagged_lesson_ids(&self) -> Vec<String> {
        self.live_lesson_hours().filter(|lh| lh.flag_on).map(|lh| lh.lesson_id.clone()).collect()
    }

    #[must_use]
    pub fn lesson_ids(&self) -> Vec<String> {
        self.live_lesson_hours().map(|lh| lh.lesson_id.clone()).collect()
    }

    /// Staff-entered entries (other hours or expenses) are present.
    #[must_use]
    pub fn has_staff_entries(&self) -> bool {
        self.other_working_hours.iter().any(|o| !o.is_deleted)
            || self.transportation_expenses.iter().any(|t| !t.is_deleted)
    }

    /// No live lesson-hours, other working hours or transportation expenses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_lesson_hours().next().is_none() && !self.has_staff_entries()
    }

    /// Dated strictly before `today`.
    #[must_use]
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    #[must_use]
    pub fn is_within_valid_range(&self) -> bool {
        self.date >= MIN_TIMESHEET_DATE
    }

    /// Add a lesson-hours entry unless the lesson is already linked.
    ///
    /// Returns `false` when nothing changed, which keeps repeated builds
    /// from the same inputs free of duplicates.
    pub fn add_lesson_hours(&mut self, lesson_id: &str, flag_on: bool) -> bool {
        if self.has_lesson(lesson_id) {
            return false;
        }
        self.lesson_hours.push(LessonHours::new(self.id.clone(), lesson_id, flag_on));
        true
    }

    /// Mark every live entry for `lesson_id` as deleted.
    ///
    /// Returns `false` when the lesson is not linked to this timesheet.
    pub fn remove_lesson_hours(&mut self, lesson_id: &str) -> bool {
        let mut removed = false;
        for lh in self.lesson_hours.iter_mut().filter(|lh| lh.is_live() && lh.lesson_id == lesson_id) {
            lh.is_deleted = true;
            removed = true;
        }
        removed
    }

    /// Remove `lesson_id` and flag the timesheet for deletion once nothing
    /// is left in it. Returns whether anything changed.
    pub fn strip_lesson(&mut self, lesson_id: &str) -> bool {
        if !self.remove_lesson_hours(lesson_id) {
            return false;
        }
        if self.is_empty() {
            self.is_deleted = true;
        }
        true
    }

    /// Set the ID and propagate it to every owned entry.
    pub fn assign_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        for lh in &mut self.lesson_hours {
            lh.timesheet_id.clone_from(&self.id);
        }
        for owh in &mut self.other_working_hours {
            owh.timesheet_id.clone_from(&self.id);
        }
        for te in &mut self.transportation_expenses {
            te.timesheet_id.clone_from(&self.id);
        }
    }

    /// Combine two partial views of the same timesheet.
    ///
    /// IDs must match unless one side is still unsaved; staff, location,
    /// date and status must match exactly. Entry lists are concatenated and
    /// the surviving ID is propagated to them.
    ///
    /// # Errors
    ///
    /// Returns the generic merge conflict when any scalar field differs.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        let ids_compatible = self.id == other.id || self.id.is_empty() || other.id.is_empty();
        if !ids_compatible
            || self.staff_id != other.staff_id
            || self.location_id != other.location_id
            || self.date != other.date
            || self.status != other.status
        {
            return Err(TimesheetError::merge_failed());
        }

        let id = if self.id.is_empty() { other.id } else { std::mem::take(&mut self.id) };
        self.is_created |= other.is_created;
        self.is_deleted &= other.is_deleted;
        self.lesson_hours.extend(other.lesson_hours);
        self.other_working_hours.extend(other.other_working_hours);
        self.transportation_expenses.extend(other.transportation_expenses);
        self.assign_id(id);
        Ok(self)
    }
}
