//! Timesheet persistence ports and the direct-edit service

pub mod ports;
pub mod service;

pub use service::TimesheetService;
