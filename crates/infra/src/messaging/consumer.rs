//! Lesson event consumer
//!
//! Decodes inbound envelopes by subject and hands each event to the
//! reconciler under a system requester. Failures are logged and the loop
//! keeps draining; redelivery belongs to the bus.

use std::sync::Arc;

use chrono::Utc;
use timesheet_core::{LessonEventReconciler, OperationContext, ReconcileOutcome};
use timesheet_domain::{
    LessonCreated, LessonDeleted, LessonEvent, LessonUpdated, MessagingConfig, Requester, Result,
    TimesheetError,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::envelope::Envelope;

/// User ID recorded on everything the consumer does.
pub const LESSON_CONSUMER_ID: &str = "lesson-event-consumer";

pub struct LessonEventConsumer {
    reconciler: Arc<LessonEventReconciler>,
    created_subject: String,
    updated_subject: String,
    deleted_subject: String,
}

impl LessonEventConsumer {
    pub fn new(reconciler: Arc<LessonEventReconciler>, config: &MessagingConfig) -> Self {
        Self {
            reconciler,
            created_subject: config.lesson_created_subject.clone(),
            updated_subject: config.lesson_updated_subject.clone(),
            deleted_subject: config.lesson_deleted_subject.clone(),
        }
    }

    /// Subjects this consumer should be subscribed to.
    pub fn subjects(&self) -> [&str; 3] {
        [self.created_subject.as_str(), self.updated_subject.as_str(), self.deleted_subject.as_str()]
    }

    /// Decode an envelope into a lesson event.
    ///
    /// # Errors
    /// Returns `TimesheetError::InvalidArgument` for an unknown subject or a
    /// malformed payload.
    pub fn decode(&self, envelope: &Envelope) -> Result<LessonEvent> {
        let subject = envelope.subject.as_str();
        if subject == self.created_subject {
            Ok(LessonEvent::Created(envelope.decode::<LessonCreated>()?))
        } else if subject == self.updated_subject {
            Ok(LessonEvent::Updated(envelope.decode::<LessonUpdated>()?))
        } else if subject == self.deleted_subject {
            Ok(LessonEvent::Deleted(envelope.decode::<LessonDeleted>()?))
        } else {
            Err(TimesheetError::InvalidArgument(format!("unknown lesson event subject: {subject}")))
        }
    }

    /// Decode and reconcile one envelope.
    ///
    /// # Errors
    /// Propagates decoding and reconciliation failures.
    #[instrument(skip(self, envelope, cancellation), fields(subject = %envelope.subject))]
    pub async fn handle(
        &self,
        envelope: &Envelope,
        cancellation: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let event = self.decode(envelope)?;
        let ctx = OperationContext::new(Requester::system(LESSON_CONSUMER_ID), Utc::now())
            .with_cancellation(cancellation.child_token());
        self.reconciler.handle(&ctx, &event).await
    }

    /// Drain `inbound` until it closes or `shutdown` fires.
    pub async fn run(&self, mut inbound: mpsc::Receiver<Envelope>, shutdown: CancellationToken) {
        info!(subjects = ?self.subjects(), "Starting lesson event consumer");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    break;
                }
                received = inbound.recv() => {
                    let Some(envelope) = received else {
                        warn!("Inbound channel closed, stopping consumer");
                        break;
                    };
                    match self.handle(&envelope, &shutdown).await {
                        Ok(outcome) => info!(
                            subject = %envelope.subject,
                            upserted = outcome.upserted,
                            removed = outcome.removed,
                            flag_refreshed = outcome.flag_refreshed,
                            "Lesson event reconciled"
                        ),
                        Err(err) => error!(
                            subject = %envelope.subject,
                            error = %err,
                            retryable = err.is_retryable(),
                            "Failed to reconcile lesson event"
                        ),
                    }
                }
            }
        }
    }
}
