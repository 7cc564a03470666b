//! Direct-edit requests
//!
//! Staff create a timesheet by hand or edit its remark and staff-entered
//! entries. Validation here is structural; status and permission checks
//! belong to the service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entries::{OtherWorkingHours, TransportationExpense};
use crate::constants::{
    MAX_OTHER_WORKING_HOURS, MAX_REMARK_LENGTH, MAX_TRANSPORTATION_EXPENSES, MIN_TIMESHEET_DATE,
};
use crate::errors::{Result, TimesheetError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTimesheetRequest {
    pub staff_id: String,
    pub location_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub other_working_hours: Vec<OtherWorkingHours>,
    #[serde(default)]
    pub transportation_expenses: Vec<TransportationExpense>,
}

impl CreateTimesheetRequest {
    /// Validate and normalize the request in place.
    ///
    /// # Errors
    ///
    /// Returns [`TimesheetError::InvalidArgument`] describing the first
    /// violated rule.
    pub fn validate(&mut self) -> Result<()> {
        if self.staff_id.trim().is_empty() {
            return Err(invalid("staff id must not be empty"));
        }
        if self.location_id.trim().is_empty() {
            return Err(invalid("location id must not be empty"));
        }
        if self.date < MIN_TIMESHEET_DATE {
            return Err(invalid("date must be greater than 1st Jan 2022"));
        }
        if self.other_working_hours.is_empty() {
            return Err(invalid("other working hours must be not empty"));
        }
        validate_details(
            &self.remark,
            &mut self.other_working_hours,
            &self.transportation_expenses,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTimesheetRequest {
    pub timesheet_id: String,
    #[serde(default)]
    pub remark: String,
    /// Entries with an ID update existing rows; entries without one are new.
    #[serde(default)]
    pub other_working_hours: Vec<OtherWorkingHours>,
    #[serde(default)]
    pub transportation_expenses: Vec<TransportationExpense>,
}

impl UpdateTimesheetRequest {
    /// # Errors
    ///
    /// Returns [`TimesheetError::InvalidArgument`] describing the first
    /// violated rule.
    pub fn validate(&mut self) -> Result<()> {
        if self.timesheet_id.trim().is_empty() {
            return Err(invalid("timesheet id must not be empty"));
        }
        validate_details(
            &self.remark,
            &mut self.other_working_hours,
            &self.transportation_expenses,
        )
    }
}

fn validate_details(
    remark: &str,
    other_working_hours: &mut [OtherWorkingHours],
    transportation_expenses: &[TransportationExpense],
) -> Result<()> {
    if remark.chars().count() > MAX_REMARK_LENGTH {
        return Err(invalid(format!("remark must be limit to {MAX_REMARK_LENGTH} characters")));
    }
    if other_working_hours.len() > MAX_OTHER_WORKING_HOURS {
        return Err(invalid(format!(
            "list other working hours must be limit to {MAX_OTHER_WORKING_HOURS} rows"
        )));
    }
    if transportation_expenses.len() > MAX_TRANSPORTATION_EXPENSES {
        return Err(invalid(format!(
            "list transportation expenses must be limit to {MAX_TRANSPORTATION_EXPENSES} rows"
        )));
    }
    for owh in other_working_hours.iter_mut() {
        owh.normalize()?;
    }
    for expense in transportation_expenses {
        expense.validate()?;
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> TimesheetError {
    TimesheetError::InvalidArgument(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn owh() -> OtherWorkingHours {
        OtherWorkingHours::new(
            "cfg-1",
            Utc.with_ymd_and_hms(2023, 6, 1, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 2, 30, 0).unwrap(),
            "",
        )
    }

    fn create_request() -> CreateTimesheetRequest {
        CreateTimesheetRequest {
            staff_id: "staff-1".into(),
            location_id: "loc-1".into(),
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            remark: String::new(),
            other_working_hours: vec![owh()],
            transportation_expenses: Vec::new(),
        }
    }

    #[test]
    fn valid_create_request_passes() {
        let mut request = create_request();
        assert!(request.validate().is_ok());
        assert_eq!(request.other_working_hours[0].total_minutes, 90);
    }

    #[test]
    fn create_requires_other_working_hours() {
        let mut request = create_request();
        request.other_working_hours.clear();

        let err = request.validate().unwrap_err();
        assert_eq!(err, invalid("other working hours must be not empty"));
    }

    #[test]
    fn create_rejects_dates_before_2022() {
        let mut request = create_request();
        request.date = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();

        assert_eq!(request.validate().unwrap_err(), invalid("date must be greater than 1st Jan 2022"));
    }

    #[test]
    fn remark_is_limited_to_500_chars() {
        let mut request = create_request();
        request.remark = "あ".repeat(501);

        assert!(request.validate().is_err());

        request.remark = "あ".repeat(500);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn other_working_hours_limited_to_five_rows() {
        let mut request = create_request();
        request.other_working_hours = vec![owh(); 6];

        assert!(request.validate().is_err());
    }

    #[test]
    fn update_allows_empty_lists() {
        let mut request = UpdateTimesheetRequest {
            timesheet_id: "ts-1".into(),
            remark: "note".into(),
            other_working_hours: Vec::new(),
            transportation_expenses: Vec::new(),
        };
        assert!(request.validate().is_ok());
    }
}
