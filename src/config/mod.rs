//! Configuration pipeline
//!
//! The provider contract that feeds route and cluster definitions in, the
//! user filter chain, immutable published snapshots, typed pipeline
//! errors, and the [`ConfigManager`] orchestrator tying them together.

mod error;
mod filter;
mod manager;
mod provider;
mod snapshot;

pub use error::{
    BoxError, ConfigError, RecordRef, ReloadFailure, ValidationError, ValidationErrorKind,
};
pub use filter::{ConfigFilter, FilterChain};
pub use manager::{ConfigManager, ReloadEvent};
pub use provider::{ConfigProvider, InMemoryConfigProvider, ProxyConfig};
pub use snapshot::Snapshot;
