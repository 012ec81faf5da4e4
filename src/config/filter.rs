//! User-pluggable configuration filters.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::error::{BoxError, ConfigError, RecordRef};
use crate::domain::{ClusterSpec, RouteSpec};

/// A user-supplied transform applied to every record on every reload.
///
/// Filters run in registration order; each sees the output of the
/// previous one and may repair, enrich, or reject records before
/// validation. The default implementations pass records through
/// unchanged.
#[async_trait]
pub trait ConfigFilter: Send + Sync {
    async fn configure_route(
        &self,
        route: RouteSpec,
        _cancel: &CancellationToken,
    ) -> Result<RouteSpec, BoxError> {
        Ok(route)
    }

    async fn configure_cluster(
        &self,
        cluster: ClusterSpec,
        _cancel: &CancellationToken,
    ) -> Result<ClusterSpec, BoxError> {
        Ok(cluster)
    }
}

/// Ordered filter pipeline with per-record failure isolation: a failing
/// record is dropped and reported while every other record keeps flowing.
#[derive(Default, Clone)]
pub struct FilterChain {
    filters: Vec<Arc<dyn ConfigFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn ConfigFilter>>) -> Self {
        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn apply_routes(
        &self,
        routes: Vec<RouteSpec>,
        cancel: &CancellationToken,
    ) -> (Vec<RouteSpec>, Vec<ConfigError>) {
        let mut kept = Vec::with_capacity(routes.len());
        let mut failures = Vec::new();

        'routes: for route in routes {
            let route_id = route.route_id.clone();
            let mut current = route;
            for filter in &self.filters {
                match filter.configure_route(current, cancel).await {
                    Ok(next) => current = next,
                    Err(source) => {
                        debug!(route_id = %route_id, error = %source, "Route filter failed");
                        failures.push(ConfigError::Filter {
                            record: RecordRef::Route(route_id),
                            source,
                        });
                        continue 'routes;
                    }
                }
            }
            kept.push(current);
        }

        (kept, failures)
    }

    pub async fn apply_clusters(
        &self,
        clusters: Vec<ClusterSpec>,
        cancel: &CancellationToken,
    ) -> (Vec<ClusterSpec>, Vec<ConfigError>) {
        let mut kept = Vec::with_capacity(clusters.len());
        let mut failures = Vec::new();

        'clusters: for cluster in clusters {
            let cluster_id = cluster.cluster_id.clone();
            let mut current = cluster;
            for filter in &self.filters {
                match filter.configure_cluster(current, cancel).await {
                    Ok(next) => current = next,
                    Err(source) => {
                        debug!(cluster_id = %cluster_id, error = %source, "Cluster filter failed");
                        failures.push(ConfigError::Filter {
                            record: RecordRef::Cluster(cluster_id),
                            source,
                        });
                        continue 'clusters;
                    }
                }
            }
            kept.push(current);
        }

        (kept, failures)
    }
}
