//! Route configuration records.
//!
//! A [`RouteSpec`] describes how incoming requests are matched and which
//! cluster they forward to. Instances are produced by a config provider,
//! transformed by filters, validated, and finally compiled into matcher
//! endpoints; they are never mutated in place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single route definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Unique identifier for this route within one configuration.
    pub route_id: String,

    /// Identifier of the cluster this route forwards to. May be empty.
    #[serde(default)]
    pub cluster_id: String,

    /// Request matching criteria. A route without a match never receives
    /// traffic and is rejected by validation.
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub route_match: Option<RouteMatch>,

    /// Relative evaluation order for the external matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,

    /// Authorization policy name. `Default` and `Anonymous` are reserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_policy: Option<String>,

    /// CORS policy name. `Default` and `Disable` are reserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_policy: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// Ordered transform descriptors applied per request by the
    /// forwarding engine. Validated against the transform factory
    /// registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<BTreeMap<String, String>>,
}

impl RouteSpec {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self { route_id: route_id.into(), ..Default::default() }
    }

    pub fn with_cluster(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = cluster_id.into();
        self
    }

    pub fn with_match(mut self, route_match: RouteMatch) -> Self {
        self.route_match = Some(route_match);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Matching criteria for a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    /// Host patterns: ASCII hostnames, optionally `*.`-prefixed and
    /// optionally `:port`-suffixed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    /// Route pattern consumed by the external matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// HTTP methods, normalized to uppercase during validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    /// Header constraints; all must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatch>,
}

impl RouteMatch {
    pub fn path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), ..Default::default() }
    }

    pub fn hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { hosts: hosts.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header(mut self, header: HeaderMatch) -> Self {
        self.headers.push(header);
        self
    }
}

/// A single header constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatch {
    pub name: String,

    #[serde(default)]
    pub mode: HeaderMatchMode,

    /// Required non-empty for every mode except `Exists`, which requires
    /// it empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    #[serde(default)]
    pub is_case_sensitive: bool,
}

impl HeaderMatch {
    pub fn exact(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: HeaderMatchMode::ExactHeader,
            values: vec![value.into()],
            is_case_sensitive: false,
        }
    }

    pub fn exists(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: HeaderMatchMode::Exists,
            values: Vec::new(),
            is_case_sensitive: false,
        }
    }
}

/// How header values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HeaderMatchMode {
    #[default]
    ExactHeader,
    HeaderPrefix,
    Exists,
    Contains,
    NotContains,
}

impl HeaderMatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderMatchMode::ExactHeader => "ExactHeader",
            HeaderMatchMode::HeaderPrefix => "HeaderPrefix",
            HeaderMatchMode::Exists => "Exists",
            HeaderMatchMode::Contains => "Contains",
            HeaderMatchMode::NotContains => "NotContains",
        }
    }
}

impl fmt::Display for HeaderMatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
