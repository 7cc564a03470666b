//! Recording publishers with optional failure injection

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use timesheet_core::{ActionLogPublisher, LessonLockPublisher, OperationContext};
use timesheet_domain::{
    LessonLockEvent, Result as DomainResult, TimesheetAction, TimesheetActionLog, TimesheetError,
};

#[derive(Default, Clone)]
pub struct RecordingPublisher {
    action_logs: Arc<Mutex<Vec<TimesheetActionLog>>>,
    lesson_locks: Arc<Mutex<Vec<LessonLockEvent>>>,
    failing: Arc<Mutex<bool>>,
    failing_locks: Arc<Mutex<bool>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message from now on.
    pub fn fail(&self) {
        *self.failing.lock() = true;
    }

    /// Reject lesson locks only; action logs still go through.
    pub fn fail_lesson_locks(&self) {
        *self.failing_locks.lock() = true;
    }

    pub fn action_logs(&self) -> Vec<TimesheetActionLog> {
        self.action_logs.lock().clone()
    }

    pub fn logged_ids(&self, action: TimesheetAction) -> Vec<String> {
        let mut ids: Vec<String> = self
            .action_logs()
            .into_iter()
            .filter(|log| log.action == action)
            .map(|log| log.timesheet_id)
            .collect();
        ids.sort();
        ids
    }

    pub fn lesson_locks(&self) -> Vec<LessonLockEvent> {
        self.lesson_locks.lock().clone()
    }

    fn check(&self) -> DomainResult<()> {
        if *self.failing.lock() {
            Err(TimesheetError::Internal("broker unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ActionLogPublisher for RecordingPublisher {
    async fn publish_action_log(
        &self,
        _ctx: &OperationContext,
        log: &TimesheetActionLog,
    ) -> DomainResult<()> {
        self.check()?;
        self.action_logs.lock().push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl LessonLockPublisher for RecordingPublisher {
    async fn publish_lesson_lock(
        &self,
        _ctx: &OperationContext,
        event: &LessonLockEvent,
    ) -> DomainResult<()> {
        self.check()?;
        if *self.failing_locks.lock() {
            return Err(TimesheetError::Internal("lock subject unavailable".to_string()));
        }
        self.lesson_locks.lock().push(event.clone());
        Ok(())
    }
}
