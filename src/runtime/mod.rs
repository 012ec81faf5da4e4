//! Live cluster runtime model
//!
//! One [`ClusterState`] exists per configured cluster id and keeps its
//! identity across reloads so that metrics, health state, and in-flight
//! requests stay attached to the same object. The [`ClusterRegistry`]
//! owns the live set and reconciles it against each validated
//! configuration generation.

mod cluster;
mod registry;

pub use cluster::{ClusterState, DestinationHealth, DestinationState, DynamicState};
pub use registry::{ClusterRegistry, ReconcileOutcome};
