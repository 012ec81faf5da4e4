//! # Structured Logging
//!
//! Provides structured logging setup using the tracing ecosystem.

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::errors::{Result, SwitchyardError};

static LOGGING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// One of `trace`, `debug`, `info`, `warn`, `error`, or any
    /// `EnvFilter` directive string.
    pub log_level: String,

    /// JSON output for log pipelines; compact human-readable output
    /// otherwise.
    pub json_logging: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

/// Initialize structured logging based on the options. Later calls are
/// no-ops.
pub fn init_logging(options: &LoggingOptions) -> Result<()> {
    let env_filter = parse_env_filter(&options.log_level)?;

    LOGGING_INITIALIZED.get_or_try_init(|| configure_logging(options, env_filter)).map(|_| ())
}

fn configure_logging(options: &LoggingOptions, env_filter: EnvFilter) -> Result<()> {
    let format_layer: Box<dyn Layer<Registry> + Send + Sync> = if options.json_logging {
        fmt::layer().json().with_span_list(false).boxed()
    } else {
        fmt::layer().compact().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(format_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| SwitchyardError::config(format!("Failed to initialize logging: {}", e)))
}

fn parse_env_filter(level: &str) -> Result<EnvFilter> {
    let normalized = level.trim();
    if normalized.is_empty() {
        return Err(SwitchyardError::config("Log level must not be empty"));
    }

    EnvFilter::try_new(normalized)
        .map_err(|e| SwitchyardError::config(format!("Invalid log level '{}': {}", level, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_compact() {
        let options = LoggingOptions { log_level: "debug".to_string(), json_logging: false };

        // tracing_subscriber might be already initialized by another test
        let result = init_logging(&options);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let options = LoggingOptions { log_level: "   ".to_string(), json_logging: false };
        assert!(init_logging(&options).is_err());
    }

    #[test]
    fn test_env_filter_directives_accepted() {
        assert!(parse_env_filter("info,switchyard=debug").is_ok());
        assert!(parse_env_filter("warn").is_ok());
    }
}
