//! Port interfaces for outbound notifications

use async_trait::async_trait;
use timesheet_domain::{LessonLockEvent, Result, TimesheetActionLog};

use crate::context::OperationContext;

/// Audit log sink, one message per affected timesheet
#[async_trait]
pub trait ActionLogPublisher: Send + Sync {
    /// Deliver one log entry; fails with `Publish` or `Cancelled`.
    async fn publish_action_log(&self, ctx: &OperationContext, log: &TimesheetActionLog)
        -> Result<()>;
}

/// Lesson lock sink, one message per approval batch
#[async_trait]
pub trait LessonLockPublisher: Send + Sync {
    /// Ask the lesson service to freeze `event.lesson_ids`.
    async fn publish_lesson_lock(&self, ctx: &OperationContext, event: &LessonLockEvent)
        -> Result<()>;
}
