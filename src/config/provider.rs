//! Inbound configuration provider contract.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::error::BoxError;
use crate::domain::{ClusterSpec, RouteSpec};
use crate::signal::ChangeToken;

/// One configuration generation produced by a provider.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub routes: Vec<RouteSpec>,
    pub clusters: Vec<ClusterSpec>,

    /// Fires once, when the provider has a newer generation available.
    pub change_token: ChangeToken,
}

impl ProxyConfig {
    pub fn new(routes: Vec<RouteSpec>, clusters: Vec<ClusterSpec>) -> Self {
        Self { routes, clusters, change_token: ChangeToken::new() }
    }
}

/// Produces route and cluster definitions. The storage format behind a
/// provider is its own business; the core only sees the records.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn get_config(&self) -> Result<Arc<ProxyConfig>, BoxError>;
}

/// Programmatic provider for embedders and tests.
///
/// [`update`](InMemoryConfigProvider::update) publishes a new generation
/// and fires the previous generation's change token, which triggers a
/// reload in any manager watching this provider.
#[derive(Debug)]
pub struct InMemoryConfigProvider {
    current: ArcSwap<ProxyConfig>,
}

impl InMemoryConfigProvider {
    pub fn new(routes: Vec<RouteSpec>, clusters: Vec<ClusterSpec>) -> Self {
        Self { current: ArcSwap::from_pointee(ProxyConfig::new(routes, clusters)) }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Replaces the published configuration and signals watchers.
    pub fn update(&self, routes: Vec<RouteSpec>, clusters: Vec<ClusterSpec>) {
        let next = Arc::new(ProxyConfig::new(routes, clusters));
        let previous = self.current.swap(next);
        previous.change_token.fire();
    }
}

impl Default for InMemoryConfigProvider {
    fn default() -> Self {
        Self::empty()
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn get_config(&self) -> Result<Arc<ProxyConfig>, BoxError> {
        Ok(self.current.load_full())
    }
}
