//! Outbound publisher over a bounded tokio channel.
//!
//! The receiving half stands in for the message bus client: whatever drains
//! it forwards each envelope to its subject.

use async_trait::async_trait;
use timesheet_core::{ActionLogPublisher, LessonLockPublisher, OperationContext};
use timesheet_domain::{
    LessonLockEvent, MessagingConfig, Result, TimesheetActionLog, TimesheetError,
};
use tokio::sync::mpsc;
use tracing::debug;

use super::envelope::Envelope;

#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<Envelope>,
    action_log_subject: String,
    lesson_lock_subject: String,
}

impl ChannelPublisher {
    /// Create a publisher and the receiver that drains it.
    pub fn new(config: &MessagingConfig) -> (Self, mpsc::Receiver<Envelope>) {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let publisher = Self {
            sender,
            action_log_subject: config.action_log_subject.clone(),
            lesson_lock_subject: config.lesson_lock_subject.clone(),
        };
        (publisher, receiver)
    }

    async fn send(&self, ctx: &OperationContext, envelope: Envelope) -> Result<()> {
        ctx.ensure_active()?;
        let subject = envelope.subject.clone();
        tokio::select! {
            _ = ctx.cancellation().cancelled() => {
                Err(TimesheetError::Cancelled(format!("publish to {subject} cancelled")))
            }
            sent = self.sender.send(envelope) => {
                sent.map_err(|_| TimesheetError::Publish(format!("channel for {subject} is closed")))?;
                debug!(subject = %subject, "Message published");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActionLogPublisher for ChannelPublisher {
    async fn publish_action_log(&self, ctx: &OperationContext, log: &TimesheetActionLog) -> Result<()> {
        let envelope = Envelope::encode(&self.action_log_subject, log)?;
        self.send(ctx, envelope).await
    }
}

#[async_trait]
impl LessonLockPublisher for ChannelPublisher {
    async fn publish_lesson_lock(&self, ctx: &OperationContext, event: &LessonLockEvent) -> Result<()> {
        let envelope = Envelope::encode(&self.lesson_lock_subject, event)?;
        self.send(ctx, envelope).await
    }
}
