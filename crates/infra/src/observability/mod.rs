//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence; the configured level is the fallback
//! directive. JSON output includes the active span list for log shipping.

use timesheet_domain::{LoggingConfig, Result, TimesheetError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Calling this more than once keeps the first subscriber and returns
/// `Ok(false)`.
///
/// # Errors
/// Returns `TimesheetError::Config` if the fallback level is not a valid
/// filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let json_layer =
        config.json.then(|| fmt::layer().json().with_span_list(true).with_current_span(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok();
    Ok(installed)
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| TimesheetError::Config(format!("invalid log level {level:?}: {e}")))
}
