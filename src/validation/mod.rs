//! Pure validation of route and cluster specifications.
//!
//! Validators accumulate every failure instead of stopping at the first,
//! and never panic on malformed input. Policy names are checked against a
//! host-supplied [`PolicyRegistry`]; route patterns are checked through
//! the embedding matcher's parser seam.

use std::collections::BTreeMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

mod cluster;
mod route;

pub use cluster::validate_cluster;
pub use route::validate_route;

use crate::config::ValidationError;
use crate::domain::{ClusterSpec, RouteSpec};

lazy_static! {
    static ref HOST_LABEL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?$").expect("valid host label regex");
}

/// Host-supplied policy and transform registries consulted during
/// validation. All queries are synchronous.
pub trait PolicyRegistry: Send + Sync {
    fn is_authorization_policy_registered(&self, name: &str) -> bool;
    fn is_cors_policy_registered(&self, name: &str) -> bool;
    fn is_load_balancing_policy_registered(&self, name: &str) -> bool;
    fn is_active_health_policy_registered(&self, name: &str) -> bool;
    fn is_passive_health_policy_registered(&self, name: &str) -> bool;
    fn is_affinity_failure_policy_registered(&self, name: &str) -> bool;

    /// Validates one transform descriptor, returning the factory's error
    /// messages. An empty result means some factory accepted it.
    fn validate_transform(&self, transform: &BTreeMap<String, String>) -> Vec<String>;
}

/// A registry with nothing registered. Reserved policy names validate
/// cleanly against it; anything else is reported as unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPolicyRegistry;

impl PolicyRegistry for EmptyPolicyRegistry {
    fn is_authorization_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn is_cors_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn is_load_balancing_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn is_active_health_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn is_passive_health_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn is_affinity_failure_policy_registered(&self, _name: &str) -> bool {
        false
    }

    fn validate_transform(&self, transform: &BTreeMap<String, String>) -> Vec<String> {
        let keys: Vec<&str> = transform.keys().map(String::as_str).collect();
        vec![format!("No transform factory matched the transform with keys [{}]", keys.join(", "))]
    }
}

/// Parser seam for the external matcher's route-pattern grammar.
pub trait RoutePatternParser: Send + Sync {
    fn parse(&self, pattern: &str) -> Result<(), String>;
}

/// Grammar check used when the embedder does not supply its matcher's
/// parser: a leading `/`, balanced non-nested braces, named parameters,
/// and catch-all parameters only in the final segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRoutePatternParser;

impl RoutePatternParser for DefaultRoutePatternParser {
    fn parse(&self, pattern: &str) -> Result<(), String> {
        if pattern.is_empty() {
            return Err("pattern is empty".to_string());
        }
        if !pattern.starts_with('/') {
            return Err("pattern must start with '/'".to_string());
        }

        let segments: Vec<&str> = pattern[1..].split('/').collect();
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            let mut open = None;
            for (position, ch) in segment.char_indices() {
                match ch {
                    '{' => {
                        if open.is_some() {
                            return Err("nested '{' in pattern segment".to_string());
                        }
                        open = Some(position);
                    }
                    '}' => {
                        let Some(start) = open.take() else {
                            return Err("unmatched '}' in pattern".to_string());
                        };
                        let name = &segment[start + 1..position];
                        let stripped = name.strip_prefix("**").or_else(|| name.strip_prefix('*'));
                        if stripped.map_or(name.is_empty(), str::is_empty) {
                            return Err("pattern parameter requires a name".to_string());
                        }
                        if name.starts_with("**") && index != last {
                            return Err(
                                "catch-all parameter is only valid in the final segment".to_string()
                            );
                        }
                    }
                    _ => {}
                }
            }
            if open.is_some() {
                return Err("unmatched '{' in pattern".to_string());
            }
        }
        Ok(())
    }
}

/// Bundles the registry and pattern parser behind one validation entry
/// point.
#[derive(Clone)]
pub struct Validator {
    registry: Arc<dyn PolicyRegistry>,
    patterns: Arc<dyn RoutePatternParser>,
}

impl Validator {
    pub fn new(registry: Arc<dyn PolicyRegistry>) -> Self {
        Self { registry, patterns: Arc::new(DefaultRoutePatternParser) }
    }

    /// Replaces the default pattern grammar with the embedding matcher's
    /// parser.
    pub fn with_pattern_parser(mut self, patterns: Arc<dyn RoutePatternParser>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn validate_route(&self, route: &RouteSpec) -> Vec<ValidationError> {
        route::validate_route(route, self.registry.as_ref(), self.patterns.as_ref())
    }

    pub fn validate_cluster(&self, cluster: &ClusterSpec) -> Vec<ValidationError> {
        cluster::validate_cluster(cluster, self.registry.as_ref())
    }
}

/// Checks one host pattern: an ASCII hostname, optionally prefixed with
/// `*.` and optionally suffixed with `:port`.
pub(crate) fn validate_host_name(host: &str) -> Result<(), String> {
    let name = match host.rsplit_once(':') {
        Some((head, port)) => {
            if head.is_empty() {
                return Err("missing host name before the port".to_string());
            }
            match port.parse::<u32>() {
                Ok(value) if (1..=65535).contains(&value) => head,
                _ => return Err(format!("invalid port '{}'", port)),
            }
        }
        None => host,
    };

    let name = match name.strip_prefix("*.") {
        Some(rest) if rest.starts_with('.') => {
            return Err("wildcard prefix must be followed by a host label".to_string());
        }
        Some(rest) => rest,
        None => name,
    };

    if name.is_empty() {
        return Err("host name is empty".to_string());
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err("host name contains an empty label".to_string());
        }
        // A-label (Punycode) hosts must be converted to their Unicode
        // form before they reach the configuration.
        if label.to_ascii_lowercase().starts_with("xn--") {
            return Err("host names must use the Unicode form, not Punycode".to_string());
        }
        if !HOST_LABEL_REGEX.is_match(label) {
            return Err(format!("invalid host label '{}'", label));
        }
    }

    Ok(())
}

/// HTTP methods routes may constrain on.
pub(crate) const SUPPORTED_METHODS: [&str; 8] =
    ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "TRACE"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_names_accepted() {
        for host in [
            "example.com",
            "localhost",
            "sub.example.com",
            "*.example.com",
            "example.com:8080",
            "*.example.com:443",
            "a-b.example.com",
        ] {
            assert!(validate_host_name(host).is_ok(), "expected '{}' to be valid", host);
        }
    }

    #[test]
    fn host_names_rejected() {
        for host in [
            "",
            "*.",
            "*..example.com",
            "exa mple.com",
            "example..com",
            "-example.com",
            "example.com:0",
            "example.com:65536",
            "example.com:http",
            ":8080",
        ] {
            assert!(validate_host_name(host).is_err(), "expected '{}' to be invalid", host);
        }
    }

    #[test]
    fn punycode_hosts_rejected() {
        assert!(validate_host_name("xn--mnchen-3ya.de").is_err());
        assert!(validate_host_name("www.XN--mnchen-3ya.de").is_err());
    }

    #[test]
    fn non_ascii_hosts_rejected_without_panicking() {
        assert!(validate_host_name("münchen.de").is_err());
        assert!(validate_host_name("日本.example").is_err());
    }

    #[test]
    fn pattern_parser_accepts_common_patterns() {
        let parser = DefaultRoutePatternParser;
        for pattern in ["/", "/api", "/api/{id}", "/api/{id}/items", "/{**catchall}", "/files/{*slug}"] {
            assert!(parser.parse(pattern).is_ok(), "expected '{}' to parse", pattern);
        }
    }

    #[test]
    fn pattern_parser_rejects_malformed_patterns() {
        let parser = DefaultRoutePatternParser;
        for pattern in ["", "api", "/api/{", "/api/}", "/api/{{id}}", "/api/{}", "/{**rest}/tail"] {
            assert!(parser.parse(pattern).is_err(), "expected '{}' to fail", pattern);
        }
    }

    #[test]
    fn empty_registry_rejects_transforms() {
        let registry = EmptyPolicyRegistry;
        let mut transform = std::collections::BTreeMap::new();
        transform.insert("PathPrefix".to_string(), "/v2".to_string());
        let errors = registry.validate_transform(&transform);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("PathPrefix"));
    }
}
