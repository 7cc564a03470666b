//! Database implementations

mod codec;
pub mod confirmation_repository;
pub mod lesson_repository;
pub mod manager;
pub mod settings_repository;
pub mod timesheet_repository;

pub use confirmation_repository::*;
pub use lesson_repository::*;
pub use manager::*;
pub use settings_repository::*;
pub use timesheet_repository::*;
