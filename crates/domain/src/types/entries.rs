//! Records owned by a timesheet
//!
//! Lesson-hours link a timesheet to a lesson. Other working hours and
//! transportation expenses are entered by staff directly. Each carries its
//! own soft-delete flag and the owning timesheet ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_ENTRY_REMARKS_LENGTH;
use crate::errors::{Result, TimesheetError};
use crate::impl_domain_status_conversions;

/// Link between a timesheet and a lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonHours {
    /// Empty until the owning timesheet gets its ID.
    pub timesheet_id: String,
    pub lesson_id: String,
    /// Whether the lesson counts toward automatic timesheet creation.
    pub flag_on: bool,
    /// Already present in storage.
    #[serde(skip)]
    pub is_created: bool,
    /// Marked for removal in the current write.
    #[serde(skip)]
    pub is_deleted: bool,
}

impl LessonHours {
    #[must_use]
    pub fn new(timesheet_id: impl Into<String>, lesson_id: impl Into<String>, flag_on: bool) -> Self {
        Self {
            timesheet_id: timesheet_id.into(),
            lesson_id: lesson_id.into(),
            flag_on,
            is_created: false,
            is_deleted: false,
        }
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        !self.is_deleted
    }
}

/// Staff-entered working time that is not tied to a lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherWorkingHours {
    /// Empty until persisted.
    pub id: String,
    pub timesheet_id: String,
    /// Working type, a reference into the timesheet configuration table.
    pub timesheet_config_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_minutes: i64,
    pub remarks: String,
    #[serde(skip)]
    pub is_deleted: bool,
}

impl OtherWorkingHours {
    #[must_use]
    pub fn new(
        timesheet_config_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            timesheet_id: String::new(),
            timesheet_config_id: timesheet_config_id.into(),
            start_time,
            end_time,
            total_minutes: (end_time - start_time).num_minutes(),
            remarks: remarks.into(),
            is_deleted: false,
        }
    }

    /// Check the entry and recompute `total_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`TimesheetError::InvalidArgument`] for a missing working
    /// type, a non-positive time range or an overlong remark.
    pub fn normalize(&mut self) -> Result<()> {
        if self.timesheet_config_id.trim().is_empty() {
            return Err(TimesheetError::InvalidArgument(
                "other working hours config id must not be empty".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(TimesheetError::InvalidArgument(
                "other working hours start time must be before end time".to_string(),
            ));
        }
        if self.remarks.chars().count() > MAX_ENTRY_REMARKS_LENGTH {
            return Err(TimesheetError::InvalidArgument(format!(
                "other working hours remarks must be limit to {MAX_ENTRY_REMARKS_LENGTH} characters"
            )));
        }
        self.total_minutes = (self.end_time - self.start_time).num_minutes();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportationType {
    Train,
    Bus,
}

impl_domain_status_conversions!(TransportationType {
    Train => "TYPE_TRAIN",
    Bus => "TYPE_BUS",
});

/// Transportation cost claimed against a timesheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportationExpense {
    /// Empty until persisted.
    pub id: String,
    pub timesheet_id: String,
    pub transportation_type: TransportationType,
    pub transportation_from: String,
    pub transportation_to: String,
    pub cost_amount: i64,
    pub round_trip: bool,
    pub remarks: String,
    #[serde(skip)]
    pub is_deleted: bool,
}

impl TransportationExpense {
    /// # Errors
    ///
    /// Returns [`TimesheetError::InvalidArgument`] for empty endpoints, a
    /// negative cost or an overlong remark.
    pub fn validate(&self) -> Result<()> {
        if self.transportation_from.trim().is_empty() || self.transportation_to.trim().is_empty() {
            return Err(TimesheetError::InvalidArgument(
                "transportation from and to must not be empty".to_string(),
            ));
        }
        if self.cost_amount < 0 {
            return Err(TimesheetError::InvalidArgument(
                "transportation cost amount must not be negative".to_string(),
            ));
        }
        if self.remarks.chars().count() > MAX_ENTRY_REMARKS_LENGTH {
            return Err(TimesheetError::InvalidArgument(format!(
                "transportation remarks must be limit to {MAX_ENTRY_REMARKS_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// A staff member's default route for a location, copied into every
/// timesheet auto-created for that staff and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffTransportationExpense {
    pub id: String,
    pub staff_id: String,
    pub location_id: String,
    pub transportation_type: TransportationType,
    pub transportation_from: String,
    pub transportation_to: String,
    pub cost_amount: i64,
    pub round_trip: bool,
    pub remarks: String,
}

impl StaffTransportationExpense {
    /// Unsaved expense carrying the same route and cost.
    #[must_use]
    pub fn to_expense(&self, timesheet_id: &str) -> TransportationExpense {
        TransportationExpense {
            id: String::new(),
            timesheet_id: timesheet_id.to_string(),
            transportation_type: self.transportation_type,
            transportation_from: self.transportation_from.clone(),
            transportation_to: self.transportation_to.clone(),
            cost_amount: self.cost_amount,
            round_trip: self.round_trip,
            remarks: self.remarks.clone(),
            is_deleted: false,
        }
    }
}
