//! Shared test helpers for `timesheet-core` integration tests.
//!
//! In-memory ports plus fixtures so each scenario only states the data it
//! cares about.

#![allow(dead_code)]

pub mod fixtures;
pub mod publishers;
pub mod repositories;
