//! Per-call operation context
//!
//! Carries the authenticated requester, the reference time every date
//! comparison uses, and the caller's cancellation signal. It is threaded
//! through every port call so adapters can abandon a transaction before
//! commit.

use std::time::Instant;

use chrono::{DateTime, Utc};
use timesheet_domain::{Requester, Result, TimesheetError};
use tokio_util::sync::CancellationToken;

/// Caller identity, clock and cancellation for one operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    requester: Requester,
    now: DateTime<Utc>,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// Context with no deadline and a fresh cancellation token.
    #[must_use]
    pub fn new(requester: Requester, now: DateTime<Utc>) -> Self {
        Self { requester, now, cancellation: CancellationToken::new(), deadline: None }
    }

    /// Share the caller's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Fail `ensure_active` once `deadline` passes.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub const fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Reference time for "today" and past-date checks.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// # Errors
    ///
    /// Returns [`TimesheetError::Cancelled`] once the token fired or the
    /// deadline passed.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(TimesheetError::Cancelled("operation cancelled by caller".to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TimesheetError::Cancelled("deadline exceeded".to_string()));
        }
        Ok(())
    }
}
