//! Per-cluster runtime state.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClusterSpec, DestinationSpec};
use crate::signal::ChangeToken;
use crate::transport::HttpTransport;

/// Health of one destination as reported by active or passive checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DestinationHealth {
    /// Not yet probed
    #[default]
    Unknown,
    /// Accepting traffic
    Healthy,
    /// Excluded from load balancing
    Unhealthy,
}

impl DestinationHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationHealth::Unknown => "unknown",
            DestinationHealth::Healthy => "healthy",
            DestinationHealth::Unhealthy => "unhealthy",
        }
    }

    /// Unknown destinations still receive traffic; only a known-unhealthy
    /// destination is excluded from the available set.
    pub fn is_available(&self) -> bool {
        !matches!(self, DestinationHealth::Unhealthy)
    }
}

impl fmt::Display for DestinationHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DestinationHealth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(DestinationHealth::Unknown),
            "healthy" => Ok(DestinationHealth::Healthy),
            "unhealthy" => Ok(DestinationHealth::Unhealthy),
            _ => Err(format!("Invalid health status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
struct HealthRecord {
    health: DestinationHealth,
    last_probe: Option<DateTime<Utc>>,
}

/// Runtime state for one destination. Identity is stable across reloads
/// as long as the destination id (case-insensitive) stays in the cluster.
#[derive(Debug)]
pub struct DestinationState {
    destination_id: String,
    spec: ArcSwap<DestinationSpec>,
    health: ArcSwap<HealthRecord>,
}

impl DestinationState {
    pub(crate) fn new(destination_id: String, spec: DestinationSpec) -> Self {
        Self {
            destination_id,
            spec: ArcSwap::from_pointee(spec),
            health: ArcSwap::from_pointee(HealthRecord {
                health: DestinationHealth::Unknown,
                last_probe: None,
            }),
        }
    }

    /// The destination id as it was spelled in the configuration.
    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn spec(&self) -> Arc<DestinationSpec> {
        self.spec.load_full()
    }

    pub fn address(&self) -> String {
        self.spec.load().address.clone()
    }

    pub fn health(&self) -> DestinationHealth {
        self.health.load().health
    }

    pub fn last_probe(&self) -> Option<DateTime<Utc>> {
        self.health.load().last_probe
    }

    pub(crate) fn set_spec(&self, spec: DestinationSpec) {
        self.spec.store(Arc::new(spec));
    }

    pub(crate) fn set_health(&self, health: DestinationHealth, probed_at: Option<DateTime<Utc>>) {
        self.health.store(Arc::new(HealthRecord { health, last_probe: probed_at }));
    }

    /// Forget everything health probes learned, e.g. after the address
    /// changed underneath the destination.
    pub(crate) fn reset_health(&self) {
        self.set_health(DestinationHealth::Unknown, None);
    }
}

/// Immutable per-cluster snapshot of destinations and their health.
///
/// Replaced atomically whenever destinations or health change; readers
/// take a strong reference for the duration of one decision.
#[derive(Debug, Clone, Default)]
pub struct DynamicState {
    pub all_destinations: Vec<Arc<DestinationState>>,
    pub available_destinations: Vec<Arc<DestinationState>>,
}

impl DynamicState {
    fn from_destinations(destinations: &HashMap<String, Arc<DestinationState>>) -> Self {
        let mut all: Vec<Arc<DestinationState>> = destinations.values().cloned().collect();
        all.sort_by(|a, b| a.destination_id().cmp(b.destination_id()));
        let available =
            all.iter().filter(|d| d.health().is_available()).cloned().collect();
        Self { all_destinations: all, available_destinations: available }
    }
}

/// The live, identity-stable runtime object for one cluster.
///
/// Holders of the `Arc` observe updated data across reloads; the object
/// itself is replaced only when the cluster id disappears from the
/// configuration.
#[derive(Debug)]
pub struct ClusterState {
    cluster_id: String,
    spec: ArcSwap<ClusterSpec>,
    /// Destinations keyed by case-folded id.
    destinations: ArcSwap<HashMap<String, Arc<DestinationState>>>,
    dynamic: ArcSwap<DynamicState>,
    transport: ArcSwap<HttpTransport>,
    change: ArcSwap<ChangeToken>,
    retired: AtomicBool,
}

impl ClusterState {
    pub(crate) fn new(
        spec: ClusterSpec,
        transport: Arc<HttpTransport>,
        destinations: HashMap<String, Arc<DestinationState>>,
    ) -> Self {
        let dynamic = DynamicState::from_destinations(&destinations);
        Self {
            cluster_id: spec.cluster_id.clone(),
            spec: ArcSwap::from_pointee(spec),
            destinations: ArcSwap::from_pointee(destinations),
            dynamic: ArcSwap::from_pointee(dynamic),
            transport: ArcSwap::new(transport),
            change: ArcSwap::from_pointee(ChangeToken::new()),
            retired: AtomicBool::new(false),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// The last applied cluster specification.
    pub fn spec(&self) -> Arc<ClusterSpec> {
        self.spec.load_full()
    }

    /// The current destinations-and-health snapshot.
    pub fn dynamic_state(&self) -> Arc<DynamicState> {
        self.dynamic.load_full()
    }

    /// The transport handle requests to this cluster are sent over.
    pub fn transport(&self) -> Arc<HttpTransport> {
        self.transport.load_full()
    }

    /// One-shot signal firing when this cluster's dynamic state changes.
    pub fn change_token(&self) -> ChangeToken {
        self.change.load().as_ref().clone()
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Looks a destination up by id, case-insensitively.
    pub fn destination(&self, destination_id: &str) -> Option<Arc<DestinationState>> {
        self.destinations.load().get(&destination_id.to_ascii_lowercase()).cloned()
    }

    /// Records a health probe verdict and republishes the dynamic state.
    /// Returns `false` when the destination is not part of this cluster.
    pub fn set_destination_health(
        &self,
        destination_id: &str,
        health: DestinationHealth,
    ) -> bool {
        let Some(destination) = self.destination(destination_id) else {
            return false;
        };
        destination.set_health(health, Some(Utc::now()));
        self.rebuild_dynamic_state();
        true
    }

    pub(crate) fn set_spec(&self, spec: ClusterSpec) {
        self.spec.store(Arc::new(spec));
    }

    pub(crate) fn set_transport(&self, transport: Arc<HttpTransport>) {
        self.transport.store(transport);
    }

    pub(crate) fn set_destinations(
        &self,
        destinations: HashMap<String, Arc<DestinationState>>,
    ) {
        self.destinations.store(Arc::new(destinations));
        self.rebuild_dynamic_state();
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Publishes a fresh dynamic state and fires the superseded
    /// generation's change token.
    pub(crate) fn rebuild_dynamic_state(&self) {
        let snapshot = DynamicState::from_destinations(&self.destinations.load());
        self.dynamic.store(Arc::new(snapshot));
        let previous = self.change.swap(Arc::new(ChangeToken::new()));
        previous.fire();
    }
}
