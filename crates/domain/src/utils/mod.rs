//! Calendar and merge helpers shared by core services

pub mod calendar;
pub mod merge;
