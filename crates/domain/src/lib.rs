//! # Timesheet Domain
//!
//! Business domain types for the timesheet reconciliation engine.
//!
//! This crate contains:
//! - The timesheet aggregate and its owned entries
//! - Lesson events and update classification
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and the business calendar
//!
//! ## Architecture
//! - No dependencies on other timesheet crates
//! - No I/O, no clock reads: reference times are always passed in
//! - Construction and merging are pure

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::calendar::BusinessCalendar;
pub use utils::merge::merge_timesheet_lists;
