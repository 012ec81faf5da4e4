//! Compiled matcher endpoints.
//!
//! An [`Endpoint`] is an opaque record the embedding HTTP server consumes
//! to build its request matcher: the route pattern, evaluation order, and
//! the metadata the matcher and forwarding engine read per request.
//! Switchyard compiles them; it never matches against them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{HeaderMatch, RouteSpec};
use crate::runtime::ClusterState;

mod compiler;

pub use compiler::{EndpointCompiler, EndpointConvention};

/// Pattern every route without an explicit path compiles to.
pub const CATCH_ALL_PATTERN: &str = "/{**catchall}";

/// CORS behaviour requested by a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsMarker {
    /// The host's default CORS policy applies.
    DefaultEnable,
    /// CORS is explicitly disabled for this route.
    Disable,
    /// A named policy registered by the host applies.
    Named(String),
}

/// Authorization behaviour requested by a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationMarker {
    Default,
    Anonymous,
    Named(String),
}

/// HTTP method constraint attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodsMetadata {
    /// Uppercase method names the matcher admits.
    pub methods: Vec<String>,

    /// When true the matcher also admits OPTIONS preflight requests
    /// alongside the listed methods.
    pub accepts_cors_preflight: bool,
}

/// Type-keyed extension map conventions append custom metadata to.
#[derive(Default)]
pub struct Extensions {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>()).and_then(|entry| entry.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.entries.len()).finish()
    }
}

/// Metadata the matcher and forwarding engine read off an endpoint.
#[derive(Debug)]
pub struct EndpointMetadata {
    /// The route this endpoint was compiled from.
    pub route: Arc<RouteSpec>,

    /// Host constraint; present only when the route names hosts.
    pub hosts: Option<Vec<String>>,

    /// Header constraints; present only when the route names them.
    pub headers: Option<Vec<HeaderMatch>>,

    /// Method constraint; present only when the route names methods.
    pub methods: Option<MethodsMetadata>,

    pub cors: Option<CorsMarker>,

    pub authorization: Option<AuthorizationMarker>,

    /// The resolved cluster, or `None` when the route references an
    /// unknown cluster id. The forwarding engine fails such requests with
    /// a 503.
    pub cluster: Option<Arc<ClusterState>>,

    pub extensions: Extensions,
}

impl EndpointMetadata {
    /// Whether this route accepts CORS preflight requests: true iff any
    /// CORS marker is present, including an explicit disable.
    pub fn accepts_cors_preflight(&self) -> bool {
        self.cors.is_some()
    }
}

/// An opaque, compiled route the external matcher consumes.
#[derive(Debug)]
pub struct Endpoint {
    /// Route pattern in the matcher's grammar.
    pub pattern: String,

    /// Relative evaluation order; lower values match first.
    pub order: Option<i32>,

    /// Display name; always the route id.
    pub display_name: String,

    pub metadata: EndpointMetadata,
}
