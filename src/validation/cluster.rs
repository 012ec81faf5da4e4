//! Cluster specification validation.

use std::collections::HashSet;

use crate::config::{ValidationError, ValidationErrorKind};
use crate::domain::ClusterSpec;
use crate::validation::PolicyRegistry;

/// Checks one cluster, accumulating all failures.
pub fn validate_cluster(
    cluster: &ClusterSpec,
    registry: &dyn PolicyRegistry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let cluster_id = cluster.cluster_id.as_str();

    if cluster_id.is_empty() {
        errors.push(ValidationError::cluster(
            ValidationErrorKind::MissingClusterId,
            cluster_id,
            "Missing cluster id.",
        ));
    }

    let mut folded_ids = HashSet::new();
    for (destination_id, destination) in &cluster.destinations {
        if !folded_ids.insert(destination_id.to_ascii_lowercase()) {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::DuplicateDestination,
                cluster_id,
                format!(
                    "Duplicate destination '{}' in cluster '{}'",
                    destination_id, cluster_id
                ),
            ));
        }
        if url::Url::parse(&destination.address).is_err() {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::InvalidDestination,
                cluster_id,
                format!(
                    "Destination '{}' in cluster '{}' must specify an absolute address URL, got '{}'",
                    destination_id, cluster_id, destination.address
                ),
            ));
        }
    }

    if let Some(policy) = cluster.load_balancing_policy.as_deref().filter(|p| !p.is_empty()) {
        if !registry.is_load_balancing_policy_registered(policy) {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::PolicyNotFound,
                cluster_id,
                format!("Load balancing policy '{}' not found for cluster '{}'", policy, cluster_id),
            ));
        }
    }

    if let Some(affinity) = cluster.session_affinity.as_ref().filter(|a| a.is_enabled()) {
        if let Some(policy) = affinity.failure_policy.as_deref().filter(|p| !p.is_empty()) {
            if !registry.is_affinity_failure_policy_registered(policy) {
                errors.push(ValidationError::cluster(
                    ValidationErrorKind::PolicyNotFound,
                    cluster_id,
                    format!(
                        "Affinity failure policy '{}' not found for cluster '{}'",
                        policy, cluster_id
                    ),
                ));
            }
        }
    }

    validate_health_check(cluster, &mut errors, registry);

    if let Some(client) = cluster.http_client.as_ref() {
        if client.max_connections_per_server == Some(0) {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::InvalidHttpOptions,
                cluster_id,
                format!("Max connections per server for cluster '{}' must be positive", cluster_id),
            ));
        }
    }

    if let Some(version) = cluster.http_request.as_ref().and_then(|r| r.version) {
        if !version.is_supported() {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::InvalidVersion,
                cluster_id,
                format!(
                    "Outgoing request version '{}' is not any of supported HTTP versions (1.0, 1.1 and 2).",
                    version
                ),
            ));
        }
    }

    errors
}

fn validate_health_check(
    cluster: &ClusterSpec,
    errors: &mut Vec<ValidationError>,
    registry: &dyn PolicyRegistry,
) {
    let cluster_id = cluster.cluster_id.as_str();
    let Some(health) = cluster.health_check.as_ref() else {
        return;
    };

    if let Some(active) = health.active.as_ref().filter(|a| a.is_enabled()) {
        if active.interval_secs == Some(0) {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::InvalidHealthCheck,
                cluster_id,
                format!("Active health check interval for cluster '{}' must be positive", cluster_id),
            ));
        }
        if active.timeout_secs == Some(0) {
            errors.push(ValidationError::cluster(
                ValidationErrorKind::InvalidHealthCheck,
                cluster_id,
                format!("Active health check timeout for cluster '{}' must be positive", cluster_id),
            ));
        }
        match active.policy.as_deref().filter(|p| !p.is_empty()) {
            Some(policy) => {
                if !registry.is_active_health_policy_registered(policy) {
                    errors.push(ValidationError::cluster(
                        ValidationErrorKind::PolicyNotFound,
                        cluster_id,
                        format!(
                            "Active health check policy '{}' not found for cluster '{}'",
                            policy, cluster_id
                        ),
                    ));
                }
            }
            None => {
                errors.push(ValidationError::cluster(
                    ValidationErrorKind::InvalidHealthCheck,
                    cluster_id,
                    format!("Active health check for cluster '{}' requires a policy", cluster_id),
                ));
            }
        }
    }

    if let Some(passive) = health.passive.as_ref().filter(|p| p.is_enabled()) {
        match passive.policy.as_deref().filter(|p| !p.is_empty()) {
            Some(policy) => {
                if !registry.is_passive_health_policy_registered(policy) {
                    errors.push(ValidationError::cluster(
                        ValidationErrorKind::PolicyNotFound,
                        cluster_id,
                        format!(
                            "Passive health check policy '{}' not found for cluster '{}'",
                            policy, cluster_id
                        ),
                    ));
                }
            }
            None => {
                errors.push(ValidationError::cluster(
                    ValidationErrorKind::InvalidHealthCheck,
                    cluster_id,
                    format!("Passive health check for cluster '{}' requires a policy", cluster_id),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::domain::{
        ActiveHealthCheckOptions, DestinationSpec, HealthCheckOptions, HttpClientOptions,
        HttpRequestOptions, HttpVersion, PassiveHealthCheckOptions, SessionAffinityOptions,
    };
    use crate::validation::EmptyPolicyRegistry;

    struct AllowListRegistry {
        names: HashSet<String>,
    }

    impl AllowListRegistry {
        fn with(names: &[&str]) -> Self {
            Self { names: names.iter().map(|n| n.to_string()).collect() }
        }
    }

    impl PolicyRegistry for AllowListRegistry {
        fn is_authorization_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn is_cors_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn is_load_balancing_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn is_active_health_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn is_passive_health_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn is_affinity_failure_policy_registered(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn validate_transform(&self, _transform: &BTreeMap<String, String>) -> Vec<String> {
            Vec::new()
        }
    }

    fn check(cluster: &ClusterSpec) -> Vec<ValidationError> {
        validate_cluster(cluster, &EmptyPolicyRegistry)
    }

    #[test]
    fn minimal_cluster_is_valid() {
        let cluster =
            ClusterSpec::new("c1").with_destination("d1", DestinationSpec::new("https://host:123/"));
        assert!(check(&cluster).is_empty());
    }

    #[test]
    fn missing_cluster_id() {
        let cluster = ClusterSpec::new("");
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingClusterId);
    }

    #[test]
    fn duplicate_destination_ids_differ_only_by_case() {
        let cluster = ClusterSpec::new("c1")
            .with_destination("d1", DestinationSpec::new("http://a/"))
            .with_destination("D1", DestinationSpec::new("http://b/"));
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateDestination);
    }

    #[test]
    fn unknown_load_balancing_policy() {
        let mut cluster = ClusterSpec::new("c1");
        cluster.load_balancing_policy = Some("PowerOfTwoChoices".to_string());
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Load balancing policy 'PowerOfTwoChoices' not found for cluster 'c1'"
        );
    }

    #[test]
    fn registered_load_balancing_policy_accepted() {
        let registry = AllowListRegistry::with(&["RoundRobin"]);
        let mut cluster = ClusterSpec::new("c1");
        cluster.load_balancing_policy = Some("RoundRobin".to_string());
        assert!(validate_cluster(&cluster, &registry).is_empty());
    }

    #[test]
    fn affinity_failure_policy_checked_only_when_enabled() {
        let mut cluster = ClusterSpec::new("c1");
        cluster.session_affinity = Some(SessionAffinityOptions {
            enabled: Some(false),
            failure_policy: Some("Redistribute".to_string()),
            ..Default::default()
        });
        assert!(check(&cluster).is_empty());

        if let Some(affinity) = cluster.session_affinity.as_mut() {
            affinity.enabled = Some(true);
        }
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::PolicyNotFound);
    }

    #[test]
    fn enabled_active_health_check_requires_positive_timings_and_policy() {
        let mut cluster = ClusterSpec::new("c1");
        cluster.health_check = Some(HealthCheckOptions {
            active: Some(ActiveHealthCheckOptions {
                enabled: Some(true),
                interval_secs: Some(0),
                timeout_secs: Some(0),
                policy: None,
                path: Some("/healthz".to_string()),
            }),
            passive: None,
        });

        let errors = check(&cluster);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.kind == ValidationErrorKind::InvalidHealthCheck));
    }

    #[test]
    fn disabled_health_checks_are_not_validated() {
        let mut cluster = ClusterSpec::new("c1");
        cluster.health_check = Some(HealthCheckOptions {
            active: Some(ActiveHealthCheckOptions {
                enabled: Some(false),
                interval_secs: Some(0),
                ..Default::default()
            }),
            passive: Some(PassiveHealthCheckOptions {
                enabled: None,
                policy: None,
                reactivation_period_secs: Some(0),
            }),
        });
        assert!(check(&cluster).is_empty());
    }

    #[test]
    fn passive_health_check_policy_must_be_registered() {
        let registry = AllowListRegistry::with(&["TransportFailureRate"]);
        let mut cluster = ClusterSpec::new("c1");
        cluster.health_check = Some(HealthCheckOptions {
            active: None,
            passive: Some(PassiveHealthCheckOptions {
                enabled: Some(true),
                policy: Some("TransportFailureRate".to_string()),
                reactivation_period_secs: Some(30),
            }),
        });
        assert!(validate_cluster(&cluster, &registry).is_empty());

        if let Some(passive) = cluster.health_check.as_mut().and_then(|h| h.passive.as_mut()) {
            passive.policy = Some("Unknown".to_string());
        }
        let errors = validate_cluster(&cluster, &registry);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::PolicyNotFound);
    }

    #[test]
    fn relative_destination_address_rejected() {
        let cluster =
            ClusterSpec::new("c1").with_destination("d1", DestinationSpec::new("/just/a/path"));
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidDestination);
        assert!(errors[0].message.contains("'/just/a/path'"));
    }

    #[test]
    fn zero_max_connections_rejected() {
        let cluster = ClusterSpec::new("c1").with_http_client(HttpClientOptions {
            max_connections_per_server: Some(0),
            ..Default::default()
        });
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidHttpOptions);
    }

    #[test]
    fn unsupported_request_version_message_is_exact() {
        let cluster = ClusterSpec::new("c1").with_http_request(HttpRequestOptions {
            version: Some(HttpVersion::new(1, 2)),
            ..Default::default()
        });
        let errors = check(&cluster);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Outgoing request version '1.2' is not any of supported HTTP versions (1.0, 1.1 and 2)."
        );
    }

    #[test]
    fn supported_request_versions_accepted() {
        for version in [HttpVersion::HTTP_1_0, HttpVersion::HTTP_1_1, HttpVersion::HTTP_2] {
            let cluster = ClusterSpec::new("c1").with_http_request(HttpRequestOptions {
                version: Some(version),
                ..Default::default()
            });
            assert!(check(&cluster).is_empty(), "version {} should be accepted", version);
        }
    }
}
