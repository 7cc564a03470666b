//! Timesheet lifecycle transitions and their permission guards

pub mod permissions;
pub mod state_machine;

pub use state_machine::TimesheetStateMachine;
