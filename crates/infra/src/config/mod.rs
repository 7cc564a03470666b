//! Configuration loading
//!
//! Reads `.env`, an optional TOML/JSON file and `TIMESHEET_*` environment
//! overrides into the domain `AppConfig`.

pub mod loader;

pub use loader::{load, load_from_file, probe_config_paths, ConfigLoader};
