//! Cluster configuration records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::http::{HttpClientOptions, HttpRequestOptions};

/// A single cluster definition: the set of destinations a route can
/// forward to, plus transport and health policy knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Unique identifier for this cluster within one configuration.
    pub cluster_id: String,

    /// Destinations keyed by id. Ids must be unique under
    /// case-insensitive comparison.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub destinations: BTreeMap<String, DestinationSpec>,

    /// Name of the load balancing policy, validated against the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<SessionAffinityOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckOptions>,

    /// Transport options. Their structural fingerprint, together with the
    /// cluster id, keys the HTTP client cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_client: Option<HttpClientOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestOptions>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ClusterSpec {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self { cluster_id: cluster_id.into(), ..Default::default() }
    }

    pub fn with_destination(
        mut self,
        destination_id: impl Into<String>,
        spec: DestinationSpec,
    ) -> Self {
        self.destinations.insert(destination_id.into(), spec);
        self
    }

    pub fn with_http_client(mut self, options: HttpClientOptions) -> Self {
        self.http_client = Some(options);
        self
    }

    pub fn with_http_request(mut self, options: HttpRequestOptions) -> Self {
        self.http_request = Some(options);
        self
    }
}

/// One forwarding target inside a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSpec {
    /// Absolute URL the forwarding engine sends requests to.
    pub address: String,

    /// Explicit health-probe URL; the active prober falls back to
    /// `address` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl DestinationSpec {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), ..Default::default() }
    }
}

/// Session affinity configuration for a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAffinityOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// Policy applied when the affinitized destination is unavailable.
    /// Validated against the registry when affinity is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<String>,

    /// Key the affinity provider stamps on responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_key_name: Option<String>,
}

impl SessionAffinityOptions {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

/// Active and passive health checking configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveHealthCheckOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<PassiveHealthCheckOptions>,
}

/// Active health probing: the scheduler lives outside the core, driven by
/// the published cluster list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveHealthCheckOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ActiveHealthCheckOptions {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

/// Passive health evaluation of proxied responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveHealthCheckOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// How long an unhealthy destination stays excluded before it is
    /// reconsidered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactivation_period_secs: Option<u64>,
}

impl PassiveHealthCheckOptions {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}
