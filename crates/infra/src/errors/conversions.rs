//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use rusqlite::Error as SqlError;
use serde_json::Error as JsonError;
use timesheet_domain::TimesheetError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TimesheetError);

impl From<InfraError> for TimesheetError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TimesheetError> for InfraError {
    fn from(value: TimesheetError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTimesheetError {
    fn into_timesheet(self) -> TimesheetError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TimesheetError */
/* -------------------------------------------------------------------------- */

impl IntoTimesheetError for SqlError {
    fn into_timesheet(self) -> TimesheetError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TimesheetError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TimesheetError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        TimesheetError::AlreadyExists(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => TimesheetError::FailedPrecondition(
                        format!("foreign key constraint violation: {message}"),
                    ),
                    _ => TimesheetError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TimesheetError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TimesheetError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TimesheetError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                TimesheetError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                TimesheetError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => TimesheetError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => TimesheetError::Database("invalid SQL query".into()),
            other => TimesheetError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_timesheet())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TimesheetError */
/* -------------------------------------------------------------------------- */

impl IntoTimesheetError for PoolError {
    fn into_timesheet(self) -> TimesheetError {
        TimesheetError::Database(format!("connection pool error: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_timesheet())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → TimesheetError */
/* -------------------------------------------------------------------------- */

impl IntoTimesheetError for JsonError {
    fn into_timesheet(self) -> TimesheetError {
        use serde_json::error::Category;

        match self.classify() {
            Category::Io => TimesheetError::Internal(format!("json io failure: {self}")),
            Category::Syntax | Category::Data | Category::Eof => {
                TimesheetError::InvalidArgument(format!("malformed message payload: {self}"))
            }
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_timesheet())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → TimesheetError */
/* -------------------------------------------------------------------------- */

impl IntoTimesheetError for JoinError {
    fn into_timesheet(self) -> TimesheetError {
        if self.is_cancelled() {
            TimesheetError::Cancelled("blocking database task cancelled".into())
        } else {
            TimesheetError::Internal(format!("blocking database task failed: {self}"))
        }
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        InfraError(value.into_timesheet())
    }
}
