//! Upstream HTTP transport construction and caching.
//!
//! Transports are keyed on the structural fingerprint of
//! `(cluster_id, HttpClientOptions)`. The cluster id is part of the key
//! because client certificates and header encodings are per-cluster even
//! when every other field matches; fingerprinting by options alone would
//! alias transports across clusters. Replaced or retired transports drain
//! for a grace period before disposal so in-flight requests finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::{HttpClientOptions, SslProtocol};
use crate::errors::{Result, SwitchyardError};

/// Grace period before a replaced or retired transport is disposed.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(60);

/// Canonical cache key for one transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportKey {
    pub cluster_id: String,
    pub options: HttpClientOptions,
}

impl TransportKey {
    pub fn new(cluster_id: impl Into<String>, options: Option<&HttpClientOptions>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            options: options.cloned().unwrap_or_default(),
        }
    }
}

/// A reference-counted handle to one configured upstream HTTP client.
///
/// Once a handle is draining, no new borrows may start on it; requests
/// already holding the `Arc` complete naturally.
#[derive(Debug)]
pub struct HttpTransport {
    key: TransportKey,
    client: reqwest::Client,
    created_at: DateTime<Utc>,
    draining: AtomicBool,
}

impl HttpTransport {
    pub fn new(key: TransportKey, client: reqwest::Client) -> Self {
        Self { key, client, created_at: Utc::now(), draining: AtomicBool::new(false) }
    }

    pub fn key(&self) -> &TransportKey {
        &self.key
    }

    pub fn options(&self) -> &HttpClientOptions {
        &self.key.options
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Encoding the forwarding engine applies to outgoing request headers.
    pub fn request_header_encoding(&self) -> Option<&str> {
        self.key.options.request_header_encoding.as_deref()
    }

    fn mark_draining(&self) {
        self.draining.store(true, Ordering::Release);
    }
}

/// Builds one transport per cache key.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn build(&self, key: &TransportKey) -> Result<HttpTransport>;
}

/// Default factory: a `reqwest` client configured from the options.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnectorFactory;

#[async_trait]
impl TransportFactory for HttpConnectorFactory {
    async fn build(&self, key: &TransportKey) -> Result<HttpTransport> {
        let options = &key.options;
        let mut builder = reqwest::Client::builder();

        if let Some(protocols) = &options.ssl_protocols {
            let minimum = if protocols.contains(&SslProtocol::Tls12) {
                reqwest::tls::Version::TLS_1_2
            } else {
                reqwest::tls::Version::TLS_1_3
            };
            builder = builder.min_tls_version(minimum);
        }

        if let Some(max) = options.max_connections_per_server {
            builder = builder.pool_max_idle_per_host(max as usize);
        }

        if options.dangerous_accept_any_server_certificate.unwrap_or(false) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(certificate) = &options.client_certificate {
            let identity = reqwest::Identity::from_pem(&certificate.pem).map_err(|e| {
                SwitchyardError::transport_with_source(
                    format!("Invalid client certificate '{}'", certificate.id),
                    Box::new(e),
                )
            })?;
            builder = builder.identity(identity);
        }

        let client = builder.build().map_err(|e| {
            SwitchyardError::transport_with_source(
                format!("Failed to construct HTTP client for cluster '{}'", key.cluster_id),
                Box::new(e),
            )
        })?;

        Ok(HttpTransport::new(key.clone(), client))
    }
}

/// Builds and reuses transports, disposing replaced handles after a drain
/// grace period.
pub struct HttpClientCache {
    factory: Arc<dyn TransportFactory>,
    clients: Arc<DashMap<TransportKey, Arc<HttpTransport>>>,
    drain_grace: Duration,
}

impl HttpClientCache {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_grace_period(factory, DEFAULT_DRAIN_GRACE)
    }

    /// The grace period must be nonzero; a zero argument is raised to the
    /// smallest usable value.
    pub fn with_grace_period(factory: Arc<dyn TransportFactory>, drain_grace: Duration) -> Self {
        Self {
            factory,
            clients: Arc::new(DashMap::new()),
            drain_grace: drain_grace.max(Duration::from_millis(1)),
        }
    }

    /// Returns a transport for the cluster's options.
    ///
    /// When `previous` matches the requested fingerprint it is returned
    /// unchanged; otherwise a new transport is built and the previous
    /// handle is scheduled for disposal after the grace period.
    pub async fn acquire(
        &self,
        cluster_id: &str,
        options: Option<&HttpClientOptions>,
        previous: Option<&Arc<HttpTransport>>,
    ) -> Result<Arc<HttpTransport>> {
        let key = TransportKey::new(cluster_id, options);

        if let Some(previous) = previous {
            if previous.key() == &key && !previous.is_draining() {
                return Ok(Arc::clone(previous));
            }
        }

        // The map guard must drop before the insert below and before any
        // await point.
        let existing = self
            .clients
            .get(&key)
            .filter(|entry| !entry.is_draining())
            .map(|entry| Arc::clone(entry.value()));

        let transport = match existing {
            Some(existing) => existing,
            None => {
                let built = Arc::new(self.factory.build(&key).await?);
                self.clients.insert(key, Arc::clone(&built));
                debug!(
                    cluster_id = %built.key().cluster_id,
                    "Constructed upstream HTTP client"
                );
                built
            }
        };

        if let Some(previous) = previous {
            if previous.key() != transport.key() {
                self.schedule_disposal(Arc::clone(previous));
            }
        }

        Ok(transport)
    }

    /// Retires a handle: it stops accepting new borrows immediately and
    /// its cache entry is evicted once the grace period elapses.
    pub fn release(&self, handle: &Arc<HttpTransport>) {
        self.schedule_disposal(Arc::clone(handle));
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn schedule_disposal(&self, transport: Arc<HttpTransport>) {
        transport.mark_draining();
        let clients = Arc::clone(&self.clients);
        let grace = self.drain_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let key = transport.key().clone();
            // A later acquire may have installed a live transport under
            // the same fingerprint; only evict our own entry.
            clients.remove_if(&key, |_, current| Arc::ptr_eq(current, &transport));
            debug!(cluster_id = %key.cluster_id, "Disposed drained HTTP client");
        });
    }
}
