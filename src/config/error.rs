//! Typed errors produced by the configuration pipeline.
//!
//! Validation and filter failures are ordinary values accumulated across
//! the whole reload; nothing in the pipeline panics on bad input. One
//! reload attempt rolls every failure up into a [`ReloadFailure`].

use std::fmt;

/// Boxed error type carried by filter and provider failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Identifies the record a pipeline error refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Route(String),
    Cluster(String),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Route(id) => write!(f, "route '{}'", id),
            RecordRef::Cluster(id) => write!(f, "cluster '{}'", id),
        }
    }
}

/// Classifies a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    MissingRouteId,
    MissingMatch,
    InvalidHost,
    InvalidPath,
    InvalidMethod,
    DuplicateMethod,
    InvalidHeaderMatch,
    PolicyConflict,
    PolicyNotFound,
    InvalidTransform,
    MissingClusterId,
    DuplicateDestination,
    InvalidDestination,
    InvalidHealthCheck,
    InvalidHttpOptions,
    InvalidVersion,
    DuplicateRoute,
    DuplicateCluster,
}

/// A user-fixable configuration problem tied to one record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub record: RecordRef,
    pub message: String,
}

impl ValidationError {
    pub fn route(
        kind: ValidationErrorKind,
        route_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { kind, record: RecordRef::Route(route_id.into()), message: message.into() }
    }

    pub fn cluster(
        kind: ValidationErrorKind,
        cluster_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { kind, record: RecordRef::Cluster(cluster_id.into()), message: message.into() }
    }
}

/// A single failure inside one reload attempt.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A user filter failed while transforming a record. The record is
    /// dropped from the pipeline; the rest continue.
    #[error("A configuration filter failed for {record}: {source}")]
    Filter {
        record: RecordRef,
        #[source]
        source: BoxError,
    },

    /// The upstream provider failed to produce a configuration.
    #[error("Failed to load configuration from the provider: {source}")]
    Load {
        #[source]
        source: BoxError,
    },

    /// Building runtime state for a cluster failed.
    #[error("Failed to build cluster runtime state: {source}")]
    Runtime {
        #[source]
        source: crate::errors::SwitchyardError,
    },

    /// The reload was cancelled before it could publish.
    #[error("The configuration reload was cancelled")]
    Cancelled,
}

impl ConfigError {
    /// The validation error inside this failure, if any.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ConfigError::Validation(error) => Some(error),
            _ => None,
        }
    }
}

/// Aggregate of every failure from one reload attempt.
#[derive(Debug, Default)]
pub struct ReloadFailure {
    pub errors: Vec<ConfigError>,
}

impl ReloadFailure {
    pub fn single(error: ConfigError) -> Self {
        Self { errors: vec![error] }
    }

    pub fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ConfigError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the attempt was aborted by cancellation rather than by
    /// configuration problems.
    pub fn cancelled(&self) -> bool {
        self.errors.iter().any(|e| matches!(e, ConfigError::Cancelled))
    }

    /// All validation errors in the aggregate.
    pub fn validation_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter_map(ConfigError::as_validation)
    }
}

impl fmt::Display for ReloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReloadFailure {}

impl From<ConfigError> for ReloadFailure {
    fn from(error: ConfigError) -> Self {
        Self::single(error)
    }
}
