//! Port interfaces for lesson-side data
//!
//! Lessons, preference history and staff defaults are owned by other
//! services; core only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use timesheet_domain::{AutoCreateFlagActivityLog, Lesson, Result, StaffTransportationExpense};

use crate::context::OperationContext;

/// Lesson read model used for status validation
#[async_trait]
pub trait LessonReader: Send + Sync {
    /// Lessons by ID, including soft-deleted ones
    async fn find_by_ids(&self, ctx: &OperationContext, lesson_ids: &[String])
        -> Result<Vec<Lesson>>;
}

/// Auto-create preference history
#[async_trait]
pub trait AutoCreateFlagLogReader: Send + Sync {
    /// Latest entry per staff with `change_time <= at`
    async fn find_latest_by_staff(
        &self,
        ctx: &OperationContext,
        staff_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<Vec<AutoCreateFlagActivityLog>>;
}

/// Partner-wide settings
#[async_trait]
pub trait PartnerSettingsReader: Send + Sync {
    /// Partner default for auto-create eligibility; `None` when unset
    async fn partner_auto_create_flag(&self, ctx: &OperationContext) -> Result<Option<bool>>;
}

/// Staff default transportation routes
#[async_trait]
pub trait StaffTransportationExpenseReader: Send + Sync {
    /// Defaults for each `(staff_id, location_id)` pair
    async fn find_by_staff_and_location(
        &self,
        ctx: &OperationContext,
        keys: &[(String, String)],
    ) -> Result<Vec<StaffTransportationExpense>>;
}
