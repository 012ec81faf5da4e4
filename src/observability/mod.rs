//! # Observability
//!
//! Structured logging setup for embedders. The core itself only emits
//! `tracing` events; initializing a subscriber is the embedding
//! application's choice.

mod logging;

pub use logging::{init_logging, LoggingOptions};
