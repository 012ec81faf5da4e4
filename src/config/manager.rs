//! The configuration manager: fetch → filter → validate → reconcile →
//! compile → publish.
//!
//! Reload attempts are serialised through a single-entry queue (the
//! registry mutex); snapshot reads stay lock-free on an atomic pointer.
//! Post-startup failures never replace the published snapshot.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::error::{
    ConfigError, ReloadFailure, ValidationError, ValidationErrorKind,
};
use crate::config::filter::FilterChain;
use crate::config::provider::{ConfigProvider, ProxyConfig};
use crate::config::snapshot::Snapshot;
use crate::endpoints::{Endpoint, EndpointCompiler};
use crate::errors::{Result, SwitchyardError};
use crate::runtime::ClusterRegistry;
use crate::signal::ChangeToken;
use crate::transport::{HttpClientCache, HttpConnectorFactory};
use crate::validation::Validator;

/// How long the watcher waits before retrying an unreachable provider.
const PROVIDER_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Event published after each reload attempt.
#[derive(Debug, Clone)]
pub enum ReloadEvent {
    /// A new snapshot was published under this version.
    Applied { version: u64 },
    /// The attempt failed; the previous snapshot keeps serving.
    Failed { failure: Arc<ReloadFailure> },
}

/// Orchestrates configuration loads and owns the published snapshot.
pub struct ConfigManager {
    provider: Arc<dyn ConfigProvider>,
    filters: FilterChain,
    validator: Validator,
    compiler: EndpointCompiler,
    client_cache: Arc<HttpClientCache>,
    /// Also the single-entry reload queue: at most one reload attempt
    /// holds this lock at a time.
    registry: Mutex<ClusterRegistry>,
    snapshot: ArcSwap<Snapshot>,
    version: AtomicU64,
    upstream_token: ArcSwapOption<ChangeToken>,
    events: broadcast::Sender<ReloadEvent>,
    cancellation: CancellationToken,
    watching: AtomicBool,
}

impl ConfigManager {
    pub fn new(provider: Arc<dyn ConfigProvider>, validator: Validator) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            provider,
            filters: FilterChain::default(),
            validator,
            compiler: EndpointCompiler::default(),
            client_cache: Arc::new(HttpClientCache::new(Arc::new(HttpConnectorFactory))),
            registry: Mutex::new(ClusterRegistry::new()),
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            version: AtomicU64::new(0),
            upstream_token: ArcSwapOption::empty(),
            events,
            cancellation: CancellationToken::new(),
            watching: AtomicBool::new(false),
        }
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_compiler(mut self, compiler: EndpointCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_client_cache(mut self, client_cache: Arc<HttpClientCache>) -> Self {
        self.client_cache = client_cache;
        self
    }

    /// Loads and applies the initial configuration, then subscribes to
    /// provider change notifications.
    ///
    /// Any provider, filter, or validation failure fails the load with
    /// `"Unable to load or apply the proxy configuration."` and nothing
    /// is published.
    pub async fn initial_load(self: &Arc<Self>) -> Result<()> {
        let config = self.provider.get_config().await.map_err(|source| {
            SwitchyardError::reload(ReloadFailure::single(ConfigError::Load { source }))
        })?;
        self.upstream_token.store(Some(Arc::new(config.change_token.clone())));

        let cancel = self.cancellation.child_token();
        let version = self.apply(&config, &cancel).await.map_err(SwitchyardError::reload)?;
        info!(version, "Initial proxy configuration loaded");

        self.ensure_watching();
        Ok(())
    }

    /// The current snapshot's endpoints. The first call arms change
    /// propagation so later provider updates fire the manager's signal.
    pub fn endpoints(self: &Arc<Self>) -> Arc<Vec<Arc<Endpoint>>> {
        self.ensure_watching();
        self.snapshot.load().endpoints()
    }

    /// The current snapshot's one-shot change signal. It fires exactly
    /// once, when a strictly later snapshot is published.
    pub fn change_token(&self) -> ChangeToken {
        self.snapshot.load().change_token()
    }

    /// The whole current snapshot, for readers that need endpoints and
    /// cluster state from the same generation.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Subscription to per-reload outcome events.
    pub fn reload_events(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.subscribe()
    }

    /// Stops the watcher and cancels any in-flight reload. The published
    /// snapshot stays readable.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// Spawns the provider watcher once; later calls are no-ops.
    fn ensure_watching(self: &Arc<Self>) {
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.watching.store(false, Ordering::SeqCst);
            return;
        };
        let manager = Arc::clone(self);
        handle.spawn(async move { manager.watch_loop().await });
    }

    async fn watch_loop(self: Arc<Self>) {
        let mut token = loop {
            if let Some(token) = self.upstream_token.load_full() {
                break token.as_ref().clone();
            }
            match self.provider.get_config().await {
                Ok(config) => {
                    let token = config.change_token.clone();
                    self.upstream_token.store(Some(Arc::new(token.clone())));
                    break token;
                }
                Err(source) => {
                    error!(error = %source, "Config provider unavailable; retrying");
                    tokio::select! {
                        _ = self.cancellation.cancelled() => return,
                        _ = tokio::time::sleep(PROVIDER_RETRY_DELAY) => {}
                    }
                }
            }
        };

        debug!("Configuration watcher started");
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    debug!("Configuration watcher stopped");
                    return;
                }
                _ = token.changed() => {}
            }

            match self.provider.get_config().await {
                Ok(config) => {
                    // Triggers received while this reload runs fire the new
                    // generation's token and collapse into one follow-up.
                    token = config.change_token.clone();
                    self.upstream_token.store(Some(Arc::new(token.clone())));

                    let cancel = self.cancellation.child_token();
                    match self.apply(&config, &cancel).await {
                        Ok(version) => {
                            info!(version, "Applied updated proxy configuration");
                            let _ = self.events.send(ReloadEvent::Applied { version });
                        }
                        Err(failure) if failure.cancelled() => {
                            debug!("Configuration reload cancelled");
                        }
                        Err(failure) => {
                            error!(
                                errors = failure.errors.len(),
                                error = %failure,
                                "Failed to apply updated proxy configuration; keeping the previous snapshot"
                            );
                            let _ =
                                self.events.send(ReloadEvent::Failed { failure: Arc::new(failure) });
                        }
                    }
                }
                Err(source) => {
                    error!(error = %source, "Failed to fetch configuration from provider");
                    let _ = self.events.send(ReloadEvent::Failed {
                        failure: Arc::new(ReloadFailure::single(ConfigError::Load { source })),
                    });
                    tokio::select! {
                        _ = self.cancellation.cancelled() => return,
                        _ = tokio::time::sleep(PROVIDER_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    /// Runs one reload attempt end to end. On success the new snapshot is
    /// published and the superseded snapshot's change token fires.
    async fn apply(
        &self,
        config: &ProxyConfig,
        cancel: &CancellationToken,
    ) -> std::result::Result<u64, ReloadFailure> {
        let mut registry = self.registry.lock().await;
        let mut failure = ReloadFailure::default();

        debug!(
            routes = config.routes.len(),
            clusters = config.clusters.len(),
            "Filtering configuration records"
        );
        let (routes, route_failures) =
            self.filters.apply_routes(config.routes.clone(), cancel).await;
        let (clusters, cluster_failures) =
            self.filters.apply_clusters(config.clusters.clone(), cancel).await;
        failure.extend(route_failures);
        failure.extend(cluster_failures);
        if cancel.is_cancelled() {
            return Err(ReloadFailure::single(ConfigError::Cancelled));
        }

        debug!("Validating configuration records");
        let mut seen_routes = HashSet::new();
        for route in &routes {
            failure.extend(
                self.validator.validate_route(route).into_iter().map(ConfigError::Validation),
            );
            if !seen_routes.insert(route.route_id.clone()) {
                failure.push(ConfigError::Validation(ValidationError::route(
                    ValidationErrorKind::DuplicateRoute,
                    route.route_id.as_str(),
                    format!("Duplicate route '{}'", route.route_id),
                )));
            }
        }
        let mut seen_clusters = HashSet::new();
        for cluster in &clusters {
            failure.extend(
                self.validator.validate_cluster(cluster).into_iter().map(ConfigError::Validation),
            );
            if !seen_clusters.insert(cluster.cluster_id.clone()) {
                failure.push(ConfigError::Validation(ValidationError::cluster(
                    ValidationErrorKind::DuplicateCluster,
                    cluster.cluster_id.as_str(),
                    format!("Duplicate cluster '{}'", cluster.cluster_id),
                )));
            }
        }
        if !failure.is_empty() {
            return Err(failure);
        }
        if cancel.is_cancelled() {
            return Err(ReloadFailure::single(ConfigError::Cancelled));
        }

        let outcome = registry
            .reconcile(&clusters, &self.client_cache)
            .await
            .map_err(|source| ReloadFailure::single(ConfigError::Runtime { source }))?;
        if cancel.is_cancelled() {
            return Err(ReloadFailure::single(ConfigError::Cancelled));
        }

        debug!(routes = routes.len(), "Compiling endpoints");
        let view = registry.view();
        let mut endpoints = Vec::with_capacity(routes.len());
        for route in &routes {
            let cluster = if route.cluster_id.is_empty() {
                None
            } else {
                let resolved = view.get(&route.cluster_id).cloned();
                if resolved.is_none() {
                    debug!(
                        route_id = %route.route_id,
                        cluster_id = %route.cluster_id,
                        "Route references an unknown cluster; its requests will fail with 503"
                    );
                }
                resolved
            };
            endpoints.push(Arc::new(self.compiler.compile(route, cluster)));
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let next = Arc::new(Snapshot::new(version, endpoints, view));
        let previous = self.snapshot.swap(next);
        previous.change_token().fire();

        info!(
            version,
            routes = routes.len(),
            clusters = clusters.len(),
            clusters_added = outcome.added.len(),
            clusters_updated = outcome.updated.len(),
            clusters_removed = outcome.removed.len(),
            "Published configuration snapshot"
        );
        Ok(version)
    }
}
