//! Domain types and models
//!
//! The timesheet aggregate and its entries, lessons and lesson events,
//! auto-create eligibility, confirmation windows, identities, direct-edit
//! requests and outbound messages.

pub mod action_log;
pub mod auto_create;
pub mod confirmation;
pub mod entries;
pub mod identity;
pub mod lesson;
pub mod request;
pub mod timesheet;

pub use action_log::{LessonLockEvent, TimesheetAction, TimesheetActionLog};
pub use auto_create::{AutoCreateFlagActivityLog, AutoCreateFlagResolver};
pub use confirmation::{ConfirmationInfo, ConfirmationPeriod};
pub use entries::{
    LessonHours, OtherWorkingHours, StaffTransportationExpense, TransportationExpense,
    TransportationType,
};
pub use identity::{Requester, Role};
pub use lesson::{
    Lesson, LessonCreated, LessonDeleted, LessonEvent, LessonSchedulingStatus, LessonUpdateKind,
    LessonUpdated,
};
pub use request::{CreateTimesheetRequest, UpdateTimesheetRequest};
pub use timesheet::{Timesheet, TimesheetKey, TimesheetStatus};
