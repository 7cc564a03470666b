//! Configuration structures
//!
//! Plain serde types. Loading (env, `.env`, TOML) lives in the infra crate.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BUSINESS_TIMEZONE, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH,
    DEFAULT_POOL_SIZE, DEFAULT_PUBLISH_CHANNEL_CAPACITY, SUBJECT_LESSON_CREATED,
    SUBJECT_LESSON_DELETED, SUBJECT_LESSON_UPDATED, SUBJECT_LOCK_LESSON,
    SUBJECT_TIMESHEET_ACTION_LOG,
};
use crate::errors::{Result, TimesheetError};
use crate::utils::calendar::BusinessCalendar;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub timesheet: TimesheetConfig,
    pub messaging: MessagingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimesheetConfig {
    /// IANA timezone name all business dates are computed in.
    pub business_timezone: String,
}

impl Default for TimesheetConfig {
    fn default() -> Self {
        Self { business_timezone: DEFAULT_BUSINESS_TIMEZONE.to_string() }
    }
}

impl TimesheetConfig {
    /// Build the calendar for the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns [`TimesheetError::Config`] when the timezone name is unknown.
    pub fn calendar(&self) -> Result<BusinessCalendar> {
        self.business_timezone
            .parse::<chrono_tz::Tz>()
            .map(BusinessCalendar::new)
            .map_err(|e| {
                TimesheetError::Config(format!(
                    "invalid business timezone {}: {e}",
                    self.business_timezone
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub lesson_created_subject: String,
    pub lesson_updated_subject: String,
    pub lesson_deleted_subject: String,
    pub action_log_subject: String,
    pub lesson_lock_subject: String,
    pub channel_capacity: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            lesson_created_subject: SUBJECT_LESSON_CREATED.to_string(),
            lesson_updated_subject: SUBJECT_LESSON_UPDATED.to_string(),
            lesson_deleted_subject: SUBJECT_LESSON_DELETED.to_string(),
            action_log_subject: SUBJECT_TIMESHEET_ACTION_LOG.to_string(),
            lesson_lock_subject: SUBJECT_LOCK_LESSON.to_string(),
            channel_capacity: DEFAULT_PUBLISH_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
