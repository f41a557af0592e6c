//! Diagnostics go to stderr through `tracing`, results go to stdout.
//!
//! The level comes from `RUST_LOG` (default `info`). Setting
//! `PPIPERTURB_LOG_FORMAT=json` switches to one JSON object per event.

use std::env;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FORMAT_ENV: &str = "PPIPERTURB_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("`PPIPERTURB_LOG_FORMAT` is not valid UTF-8")]
    InvalidUnicode,
    #[error("unsupported log format `{0}`; expected `human` or `json`")]
    UnsupportedFormat(String),
    #[error("failed to install tracing subscriber: {0}")]
    InstallFailed(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber.
pub fn init_logging() -> Result<(), LoggingError> {
    let json = match env::var(LOG_FORMAT_ENV) {
        Ok(raw) => parse_log_format(&raw)?,
        Err(env::VarError::NotPresent) => false,
        Err(env::VarError::NotUnicode(_)) => return Err(LoggingError::InvalidUnicode),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt_layer = if json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// `true` for JSON output.
fn parse_log_format(raw: &str) -> Result<bool, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "human" => Ok(false),
        "json" => Ok(true),
        other => Err(LoggingError::UnsupportedFormat(other.to_string())),
    }
}
