//! # Timesheet Infrastructure
//!
//! Adapters for the ports defined in `timesheet-core`.
//!
//! This crate contains:
//! - SQLite repositories (rusqlite + r2d2) for timesheets, lessons,
//!   auto-create settings and the confirmation window
//! - Configuration loading from `.env`, TOML/JSON files and the environment
//! - Tracing subscriber setup
//! - Message envelopes, the channel publisher and the lesson event consumer
//!
//! ## Architecture
//! - Implements traits defined in `timesheet-core`
//! - Contains all "impure" code (I/O, blocking SQLite calls, channels)

pub mod config;
pub mod database;
pub mod errors;
pub mod messaging;
pub mod observability;

pub use config::ConfigLoader;
pub use database::{
    DbManager, SqliteConfirmationWindow, SqliteLessonRepository, SqliteSettingsRepository,
    SqliteTimesheetRepository,
};
pub use errors::InfraError;
pub use messaging::{ChannelPublisher, Envelope, LessonEventConsumer};
pub use observability::init_tracing;
