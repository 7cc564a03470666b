//! Application constants
//!
//! Centralized location for domain-level limits, defaults and message
//! subjects used throughout the workspace.

use chrono::NaiveDate;

// Timesheet validity
/// Earliest calendar date a timesheet may carry (2022-01-01).
pub const MIN_TIMESHEET_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2022, 1, 1) {
    Some(date) => date,
    None => NaiveDate::MIN,
};
pub const MAX_REMARK_LENGTH: usize = 500;
pub const MAX_ENTRY_REMARKS_LENGTH: usize = 100;
pub const MAX_OTHER_WORKING_HOURS: usize = 5;
pub const MAX_TRANSPORTATION_EXPENSES: usize = 10;

// Auto-create eligibility
/// Partner-wide auto-create flag used when no setting row exists.
pub const DEFAULT_PARTNER_AUTO_CREATE_FLAG: bool = false;

// Calendar
pub const DEFAULT_BUSINESS_TIMEZONE: &str = "Asia/Tokyo";

// Message subjects
pub const SUBJECT_LESSON_CREATED: &str = "Lesson.Created";
pub const SUBJECT_LESSON_UPDATED: &str = "Lesson.Updated";
pub const SUBJECT_LESSON_DELETED: &str = "Lesson.Deleted";
pub const SUBJECT_TIMESHEET_ACTION_LOG: &str = "Timesheet.ActionLog";
pub const SUBJECT_LOCK_LESSON: &str = "Timesheet.LockLesson";
pub const DEFAULT_PUBLISH_CHANNEL_CAPACITY: usize = 1024;

// Database
pub const DEFAULT_DATABASE_PATH: &str = "timesheet.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
