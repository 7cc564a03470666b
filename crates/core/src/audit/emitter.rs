//! Action-log emission after a committed mutation

use std::sync::Arc;

use ahash::AHashSet;
use timesheet_domain::{Result, TimesheetAction, TimesheetActionLog, TimesheetError};
use tracing::{debug, error};

use super::ports::ActionLogPublisher;
use crate::context::OperationContext;

/// Publishes one action log per distinct timesheet ID
#[derive(Clone)]
pub struct ActionLogEmitter {
    publisher: Arc<dyn ActionLogPublisher>,
}

impl ActionLogEmitter {
    pub fn new(publisher: Arc<dyn ActionLogPublisher>) -> Self {
        Self { publisher }
    }

    /// Publish `action` for each ID, skipping repeats.
    ///
    /// Every ID is attempted even after a failure; the first failure is
    /// returned as [`TimesheetError::Publish`] so callers can tell a lost
    /// notification from a failed mutation.
    ///
    /// # Errors
    ///
    /// Returns [`TimesheetError::Publish`] when any message was not accepted.
    pub async fn emit<'a, I>(
        &self,
        ctx: &OperationContext,
        timesheet_ids: I,
        action: TimesheetAction,
        is_system: bool,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str> + Send,
        I::IntoIter: Send,
    {
        let mut seen = AHashSet::new();
        let mut first_failure = None;
        let mut published = 0;

        for timesheet_id in timesheet_ids {
            if timesheet_id.is_empty() || !seen.insert(timesheet_id) {
                continue;
            }
            let log = TimesheetActionLog {
                timesheet_id: timesheet_id.to_string(),
                action,
                executed_by: ctx.requester().user_id.clone(),
                is_system,
                executed_at: ctx.now(),
            };
            match self.publisher.publish_action_log(ctx, &log).await {
                Ok(()) => published += 1,
                Err(err) => {
                    error!(timesheet_id, action = %action, error = %err, "Failed to publish action log");
                    first_failure.get_or_insert(err);
                }
            }
        }

        debug!(published, action = %action, "Action logs emitted");
        match first_failure {
            None => Ok(published),
            Some(err) => Err(into_publish_error(err)),
        }
    }
}

/// Normalize any sink failure into the notification-lost kind.
pub fn into_publish_error(err: TimesheetError) -> TimesheetError {
    match err {
        TimesheetError::Publish(_) => err,
        other => TimesheetError::Publish(other.to_string()),
    }
}
