//! Error types used throughout the timesheet workspace
//!
//! Every fallible operation returns [`TimesheetError`]. Variants follow the
//! taxonomy the transport layer needs to tell apart: validation and
//! precondition failures are final, permission failures are distinct from
//! them, and only infrastructure failures are worth retrying.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for timesheet operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TimesheetError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Two partial aggregates could not be combined, or a batch lookup
    /// returned a different number of rows than requested.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    /// The mutation was committed but the notification was not delivered.
    #[error("publish error: {0}")]
    Publish(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// RPC-style status code a transport layer maps errors onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    InvalidArgument,
    FailedPrecondition,
    PermissionDenied,
    AlreadyExists,
    NotFound,
    Internal,
    Unavailable,
    Cancelled,
}

/// Severity used when logging or alerting on an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl TimesheetError {
    /// Status code surfaced to the caller.
    ///
    /// Conflicts are reported as internal errors: they indicate an
    /// inconsistency between aggregates, not a caller mistake.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::InvalidArgument,
            Self::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            Self::PermissionDenied(_) => StatusCode::PermissionDenied,
            Self::AlreadyExists(_) => StatusCode::AlreadyExists,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::Database(_) | Self::Publish(_) => StatusCode::Unavailable,
            Self::Cancelled(_) => StatusCode::Cancelled,
            Self::Conflict(_) | Self::Config(_) | Self::Internal(_) => StatusCode::Internal,
        }
    }

    /// Whether the caller (or message bus) may retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Publish(_) | Self::Cancelled(_))
    }

    #[must_use]
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidArgument(_)
            | Self::FailedPrecondition(_)
            | Self::PermissionDenied(_)
            | Self::AlreadyExists(_)
            | Self::NotFound(_) => ErrorSeverity::Info,
            Self::Cancelled(_) => ErrorSeverity::Warning,
            Self::Database(_) | Self::Publish(_) | Self::Config(_) => ErrorSeverity::Error,
            Self::Conflict(_) | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Shorthand for the generic merge conflict.
    #[must_use]
    pub fn merge_failed() -> Self {
        Self::Conflict("merge failed".to_string())
    }
}

/// Result type alias for timesheet operations
pub type Result<T> = std::result::Result<T, TimesheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_surfaces_as_internal() {
        let err = TimesheetError::merge_failed();

        assert_eq!(err.status_code(), StatusCode::Internal);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "conflict: merge failed");
    }

    #[test]
    fn only_infrastructure_errors_are_retryable() {
        assert!(TimesheetError::Database("busy".into()).is_retryable());
        assert!(TimesheetError::Publish("bus down".into()).is_retryable());
        assert!(!TimesheetError::FailedPrecondition("status".into()).is_retryable());
        assert!(!TimesheetError::PermissionDenied("nope".into()).is_retryable());
    }

    #[test]
    fn permission_and_precondition_are_distinct_codes() {
        assert_ne!(
            TimesheetError::PermissionDenied(String::new()).status_code(),
            TimesheetError::FailedPrecondition(String::new()).status_code()
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&TimesheetError::NotFound("ts-1".into())).unwrap();
        assert_eq!(json, r#"{"type":"NotFound","message":"ts-1"}"#);
    }
}
