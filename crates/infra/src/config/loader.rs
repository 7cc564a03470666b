//! Configuration loader
//!
//! Builds an [`AppConfig`] from an optional file and the environment.
//!
//! ## Loading Strategy
//! 1. Load a `.env` file from the working directory, if any
//! 2. Read the base file: `TIMESHEET_CONFIG` if set, otherwise the first
//!    path found by [`probe_config_paths`]; without a file the defaults apply
//! 3. Apply environment overrides on top of the file values
//! 4. Validate the business timezone
//!
//! ## Environment Variables
//! - `TIMESHEET_CONFIG`: Config file path (TOML or JSON)
//! - `TIMESHEET_DATABASE_PATH`: Database file path
//! - `TIMESHEET_DB_POOL_SIZE`: Connection pool size
//! - `TIMESHEET_DB_BUSY_TIMEOUT_MS`: SQLite busy timeout in milliseconds
//! - `TIMESHEET_BUSINESS_TIMEZONE`: IANA timezone for business dates
//! - `TIMESHEET_SUBJECT_LESSON_CREATED`, `TIMESHEET_SUBJECT_LESSON_UPDATED`,
//!   `TIMESHEET_SUBJECT_LESSON_DELETED`, `TIMESHEET_SUBJECT_ACTION_LOG`,
//!   `TIMESHEET_SUBJECT_LOCK_LESSON`: Message subjects
//! - `TIMESHEET_CHANNEL_CAPACITY`: Outbound channel capacity
//! - `TIMESHEET_LOG_LEVEL`: Fallback filter when `RUST_LOG` is unset
//! - `TIMESHEET_LOG_JSON`: JSON log output (true/false)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use timesheet_domain::{AppConfig, Result, TimesheetError};

pub const CONFIG_PATH_ENV: &str = "TIMESHEET_CONFIG";

const CONFIG_FILE_NAMES: [&str; 2] = ["timesheet.toml", "timesheet.json"];

/// Loads application configuration from files and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    load_dotenv: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { path: None, load_dotenv: true }
    }

    /// Use `path` as the base file instead of probing.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Skip reading `.env`.
    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    /// Load the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `TimesheetError::Config` if the file cannot be read or parsed,
    /// an environment value is invalid or the timezone is unknown.
    pub fn load(&self) -> Result<AppConfig> {
        if self.load_dotenv {
            load_dotenv();
        }
        self.load_with(|key| std::env::var(key).ok())
    }

    /// Load the configuration with `lookup` standing in for the environment.
    ///
    /// # Errors
    /// See [`ConfigLoader::load`].
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = self
            .path
            .clone()
            .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(probe_config_paths);

        let mut config = match path {
            Some(path) => load_from_file(&path)?,
            None => {
                tracing::debug!("No config file found, starting from defaults");
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, &lookup)?;
        config.timesheet.calendar()?;
        Ok(config)
    }
}

/// Load configuration with the default strategy.
///
/// # Errors
/// See [`ConfigLoader::load`].
pub fn load() -> Result<AppConfig> {
    ConfigLoader::new().load()
}

/// Load configuration from a file
///
/// Format is detected by extension (`.toml` or `.json`). Missing fields
/// take their defaults.
///
/// # Errors
/// Returns `TimesheetError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    tracing::info!(path = %path.display(), "Loading configuration from file");
    read_config(path).map_err(|e| TimesheetError::Config(format!("{e:#}")))
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("invalid TOML in {}", path.display())),
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("invalid JSON in {}", path.display())),
        other => anyhow::bail!("unsupported config format: {other}"),
    }
}

/// Probe the working directory for a config file
///
/// Looks for `timesheet.toml`, then `timesheet.json`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)).find(|path| path.exists())
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("TIMESHEET_DATABASE_PATH") {
        config.database.path = path;
    }
    if let Some(size) = parse_var(lookup, "TIMESHEET_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }
    if let Some(timeout) = parse_var(lookup, "TIMESHEET_DB_BUSY_TIMEOUT_MS")? {
        config.database.busy_timeout_ms = timeout;
    }
    if let Some(tz) = lookup("TIMESHEET_BUSINESS_TIMEZONE") {
        config.timesheet.business_timezone = tz;
    }

    let messaging = &mut config.messaging;
    let subjects = [
        ("TIMESHEET_SUBJECT_LESSON_CREATED", &mut messaging.lesson_created_subject),
        ("TIMESHEET_SUBJECT_LESSON_UPDATED", &mut messaging.lesson_updated_subject),
        ("TIMESHEET_SUBJECT_LESSON_DELETED", &mut messaging.lesson_deleted_subject),
        ("TIMESHEET_SUBJECT_ACTION_LOG", &mut messaging.action_log_subject),
        ("TIMESHEET_SUBJECT_LOCK_LESSON", &mut messaging.lesson_lock_subject),
    ];
    for (key, slot) in subjects {
        if let Some(subject) = lookup(key) {
            *slot = subject;
        }
    }
    if let Some(capacity) = parse_var(lookup, "TIMESHEET_CHANNEL_CAPACITY")? {
        messaging.channel_capacity = capacity;
    }

    if let Some(level) = lookup("TIMESHEET_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("TIMESHEET_LOG_JSON") {
        config.logging.json = parse_bool("TIMESHEET_LOG_JSON", &json)?;
    }
    Ok(())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TimesheetError::Config(format!("invalid {key} value {raw:?}: {e}")))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TimesheetError::Config(format!("invalid {key} value {raw:?}: expected a boolean"))),
    }
}
