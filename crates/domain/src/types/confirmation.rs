//! Confirmation window read model
//!
//! A period is a calendar window per organization. Once a location confirms
//! a period, every timesheet dated inside it at that location is locked.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPeriod {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ConfirmationPeriod {
    /// Inclusive on both ends.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationInfo {
    pub id: String,
    pub period_id: String,
    pub location_id: String,
    pub confirmed_at: DateTime<Utc>,
}
