//! Immutable configuration snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoints::Endpoint;
use crate::runtime::ClusterState;
use crate::signal::ChangeToken;

/// One successfully applied configuration generation.
///
/// Readers obtain the snapshot through an atomic pointer and may hold it
/// for the duration of a request; later reloads publish a new snapshot
/// instead of mutating this one. Each snapshot owns a one-shot change
/// token that fires when it is superseded.
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    endpoints: Arc<Vec<Arc<Endpoint>>>,
    clusters: Arc<HashMap<String, Arc<ClusterState>>>,
    change_token: ChangeToken,
}

impl Snapshot {
    pub(crate) fn new(
        version: u64,
        endpoints: Vec<Arc<Endpoint>>,
        clusters: HashMap<String, Arc<ClusterState>>,
    ) -> Self {
        Self {
            version,
            endpoints: Arc::new(endpoints),
            clusters: Arc::new(clusters),
            change_token: ChangeToken::new(),
        }
    }

    /// The generation before any configuration has been applied.
    pub(crate) fn empty() -> Self {
        Self::new(0, Vec::new(), HashMap::new())
    }

    /// Monotonically increasing generation counter; 0 until the first
    /// successful load.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn endpoints(&self) -> Arc<Vec<Arc<Endpoint>>> {
        Arc::clone(&self.endpoints)
    }

    pub fn clusters(&self) -> Arc<HashMap<String, Arc<ClusterState>>> {
        Arc::clone(&self.clusters)
    }

    pub fn cluster(&self, cluster_id: &str) -> Option<Arc<ClusterState>> {
        self.clusters.get(cluster_id).cloned()
    }

    /// Fires when this snapshot is replaced by a strictly later one.
    pub fn change_token(&self) -> ChangeToken {
        self.change_token.clone()
    }
}
