//! Diagnostics for the `tabmatch` binary.
//!
//! Library crates log through the `log` facade; everything ends up in one
//! `tracing` subscriber writing to stderr, so stdout stays free for `--json`.

use std::sync::OnceLock;

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

/// Selects the line format: `human` (default) or `json`.
pub const LOG_FORMAT_VAR: &str = "TABMATCH_LOG_FORMAT";

static INSTALLED: OnceLock<LogFormat> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self, LoggingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::UnsupportedFormat(raw.trim().to_string())),
        }
    }

    /// Unset or non-UTF-8 values read as `Human`.
    fn from_env() -> Result<Self, LoggingError> {
        std::env::var(LOG_FORMAT_VAR).map_or(Ok(Self::Human), |raw| Self::parse(&raw))
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unsupported TABMATCH_LOG_FORMAT value `{0}`; expected `human` or `json`")]
    UnsupportedFormat(String),
    #[error("cannot route `log` records into tracing: {0}")]
    LogBridge(#[from] log::SetLoggerError),
    #[error("cannot install the tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the stderr subscriber. Later calls are no-ops.
///
/// `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) -> Result<(), LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let format = LogFormat::from_env()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let lines = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let lines = match format {
        LogFormat::Human => lines.boxed(),
        LogFormat::Json => lines.json().boxed(),
    };
    let subscriber = tracing_subscriber::registry().with(filter).with(lines);

    LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = INSTALLED.set(format);
    Ok(())
}
