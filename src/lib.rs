//! # Switchyard
//!
//! Switchyard is the configuration core of a dynamic HTTP reverse proxy.
//! It ingests externally supplied route and cluster definitions, runs them
//! through user-pluggable filters and validation, materialises an
//! immutable forwarding table together with live per-cluster runtime
//! state, and atomically swaps the published snapshot so that in-flight
//! requests always observe a consistent configuration generation.
//!
//! ## Architecture
//!
//! ```text
//! Config Provider → Filter Chain → Validator → Cluster Registry
//!                                                     ↓
//!          Change Signals ← Snapshot Swap ← Endpoint Compiler
//! ```
//!
//! ## Core Components
//!
//! - **Config Manager**: orchestrates reloads and publishes snapshots
//! - **Validator**: accumulates every route/cluster configuration error
//! - **Cluster Registry**: preserves runtime identity across reloads
//! - **HTTP Client Cache**: reuses transports keyed on option fingerprints
//! - **Endpoint Compiler**: emits opaque records for the request matcher
//!
//! The embedding HTTP server consumes the compiled endpoints and rebuilds
//! its matcher when the snapshot's change token fires; the forwarding
//! engine reads per-cluster dynamic state through atomic accessors.

pub mod config;
pub mod domain;
pub mod endpoints;
pub mod errors;
pub mod observability;
pub mod runtime;
pub mod signal;
pub mod transport;
pub mod validation;

// Re-export commonly used types and traits
pub use config::{ConfigManager, ConfigProvider, InMemoryConfigProvider, ProxyConfig, ReloadEvent};
pub use errors::{Result, SwitchyardError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "switchyard");
    }
}
