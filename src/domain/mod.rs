//! Configuration record types
//!
//! Immutable value types describing routes, clusters, destinations, and
//! their transport options. Equality is structural and drives reload
//! diffing, so all map-typed fields use ordered collections to keep
//! comparison and hashing deterministic.

mod cluster;
mod http;
mod route;

pub use cluster::{
    ActiveHealthCheckOptions, ClusterSpec, DestinationSpec, HealthCheckOptions,
    PassiveHealthCheckOptions, SessionAffinityOptions,
};
pub use http::{
    ClientCertificate, HttpClientOptions, HttpRequestOptions, HttpVersion, HttpVersionPolicy,
    SslProtocol,
};
pub use route::{HeaderMatch, HeaderMatchMode, RouteMatch, RouteSpec};
