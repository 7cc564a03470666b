//! Lesson-driven timesheet reconciliation

pub mod builder;
pub mod ports;
pub mod reconciler;

pub use builder::{assemble_timesheets, LessonPlacement, TimesheetBuilder};
pub use reconciler::{LessonEventReconciler, ReconcileOutcome};
