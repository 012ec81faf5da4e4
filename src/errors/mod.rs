//! # Error Handling
//!
//! Crate-wide error types built on `thiserror`. Pipeline-specific error
//! values (validation, filter, and reload aggregates) live in
//! [`crate::config`]; this module owns the top-level error enum they roll
//! up into.

mod types;

pub use types::{Result, SwitchyardError};
