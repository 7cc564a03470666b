//! # Timesheet Core
//!
//! Business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for persistence, lessons and notifications
//! - The timesheet builder and lesson event reconciler
//! - The lifecycle state machine and its permission guards
//! - The direct-edit service for staff-entered data
//!
//! ## Architecture Principles
//! - Only depends on `timesheet-domain`
//! - No database, message bus, or clock access
//! - All external dependencies via traits, one narrow trait per consumer
//! - Reference time and cancellation arrive through [`OperationContext`]

pub mod audit;
pub mod context;
pub mod ids;
pub mod lesson;
pub mod lifecycle;
pub mod timesheet;

// Re-export specific items to avoid ambiguity
pub use audit::{into_publish_error, ActionLogEmitter, ActionLogPublisher, LessonLockPublisher};
pub use context::OperationContext;
pub use lesson::ports::{
    AutoCreateFlagLogReader, LessonReader, PartnerSettingsReader, StaffTransportationExpenseReader,
};
pub use lesson::{
    assemble_timesheets, LessonEventReconciler, LessonPlacement, ReconcileOutcome,
    TimesheetBuilder,
};
pub use lifecycle::TimesheetStateMachine;
pub use timesheet::ports::{
    ConfirmationWindow, LessonHoursFlagUpdate, LifecycleWriter, ReconciliationWriter,
    TimesheetChangeSet, TimesheetCommandWriter, TimesheetLoadOptions, TimesheetLookup,
    TimesheetReader,
};
pub use timesheet::TimesheetService;
