//! # Error Types
//!
//! Comprehensive error types for the switchyard configuration core using
//! `thiserror`.

use crate::config::ReloadFailure;

/// Custom result type for switchyard operations
pub type Result<T> = std::result::Result<T, SwitchyardError>;

/// Main error type for the switchyard configuration core
#[derive(thiserror::Error, Debug)]
pub enum SwitchyardError {
    /// Configuration errors outside the reload pipeline
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration load could not be applied. The aggregate lists
    /// every provider, filter, and validation failure from the attempt.
    #[error("Unable to load or apply the proxy configuration.")]
    Reload {
        #[source]
        source: ReloadFailure,
    },

    /// Upstream HTTP transport construction errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Internal invariant violations
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SwitchyardError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a reload error wrapping the aggregated pipeline failures
    pub fn reload(source: ReloadFailure) -> Self {
        Self::Reload { source }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport { message: message.into(), source: None }
    }

    /// Create a transport error with source
    pub fn transport_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Transport { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// The aggregated reload failure, if this is a reload error
    pub fn reload_failure(&self) -> Option<&ReloadFailure> {
        match self {
            SwitchyardError::Reload { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ValidationError, ValidationErrorKind};

    #[test]
    fn test_error_creation() {
        let error = SwitchyardError::config("Test configuration error");
        assert!(matches!(error, SwitchyardError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error() {
        let error = SwitchyardError::validation_field("Invalid host format", "hosts");
        assert!(matches!(error, SwitchyardError::Validation { .. }));
        if let SwitchyardError::Validation { field, .. } = error {
            assert_eq!(field, Some("hosts".to_string()));
        }
    }

    #[test]
    fn test_reload_error_message_is_fixed() {
        let failure = ReloadFailure::single(ConfigError::Validation(ValidationError::route(
            ValidationErrorKind::MissingRouteId,
            "",
            "Missing route id.",
        )));
        let error = SwitchyardError::reload(failure);
        assert_eq!(error.to_string(), "Unable to load or apply the proxy configuration.");
        assert_eq!(error.reload_failure().map(|f| f.errors.len()), Some(1));
    }

    #[test]
    fn test_reload_error_source_chain() {
        use std::error::Error;

        let failure = ReloadFailure::single(ConfigError::Validation(ValidationError::route(
            ValidationErrorKind::InvalidHost,
            "r1",
            "Invalid host name 'bad host' for route 'r1'",
        )));
        let error = SwitchyardError::reload(failure);
        let source = error.source().expect("reload errors carry the aggregate as source");
        assert!(source.to_string().contains("Invalid host name"));
    }

    #[test]
    fn test_transport_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = SwitchyardError::transport_with_source("Failed to construct client", Box::new(io));
        assert_eq!(error.to_string(), "Transport error: Failed to construct client");
    }
}
