//! Reconciliation of cluster specifications into live runtime state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::ClusterSpec;
use crate::errors::Result;
use crate::runtime::cluster::{ClusterState, DestinationState};
use crate::transport::HttpClientCache;

/// Owns the live set of [`ClusterState`] objects and preserves their
/// identity across reloads. Mutated only by the reload task.
#[derive(Default)]
pub struct ClusterRegistry {
    clusters: HashMap<String, Arc<ClusterState>>,
}

/// Ids touched by one reconcile pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cluster_id: &str) -> Option<Arc<ClusterState>> {
        self.clusters.get(cluster_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// A point-in-time view of the live clusters, suitable for embedding
    /// in a published snapshot.
    pub fn view(&self) -> HashMap<String, Arc<ClusterState>> {
        self.clusters.clone()
    }

    /// Diffs the validated cluster specs against the live set: absent ids
    /// produce fresh state, present ids are updated in place, and ids
    /// missing from `specs` are retired.
    pub async fn reconcile(
        &mut self,
        specs: &[ClusterSpec],
        cache: &HttpClientCache,
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(specs.len());

        for spec in specs {
            seen.insert(spec.cluster_id.as_str());
            match self.clusters.get(&spec.cluster_id).cloned() {
                None => {
                    let state = build_cluster(spec, cache).await?;
                    self.clusters.insert(spec.cluster_id.clone(), state);
                    outcome.added.push(spec.cluster_id.clone());
                }
                Some(existing) => {
                    if existing.spec().as_ref() == spec {
                        debug!(cluster_id = %spec.cluster_id, "Cluster unchanged");
                        continue;
                    }
                    update_cluster(&existing, spec, cache).await?;
                    outcome.updated.push(spec.cluster_id.clone());
                }
            }
        }

        let absent: Vec<String> = self
            .clusters
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        for cluster_id in absent {
            if let Some(state) = self.clusters.remove(&cluster_id) {
                state.retire();
                cache.release(&state.transport());
                outcome.removed.push(cluster_id);
            }
        }

        if !outcome.is_noop() {
            info!(
                added = outcome.added.len(),
                updated = outcome.updated.len(),
                removed = outcome.removed.len(),
                "Cluster registry reconciled"
            );
        }

        Ok(outcome)
    }
}

async fn build_cluster(spec: &ClusterSpec, cache: &HttpClientCache) -> Result<Arc<ClusterState>> {
    let transport = cache.acquire(&spec.cluster_id, spec.http_client.as_ref(), None).await?;

    let mut destinations = HashMap::with_capacity(spec.destinations.len());
    for (destination_id, destination_spec) in &spec.destinations {
        destinations.insert(
            destination_id.to_ascii_lowercase(),
            Arc::new(DestinationState::new(destination_id.clone(), destination_spec.clone())),
        );
    }

    Ok(Arc::new(ClusterState::new(spec.clone(), transport, destinations)))
}

async fn update_cluster(
    state: &Arc<ClusterState>,
    spec: &ClusterSpec,
    cache: &HttpClientCache,
) -> Result<()> {
    let previous_transport = state.transport();
    let transport = cache
        .acquire(&spec.cluster_id, spec.http_client.as_ref(), Some(&previous_transport))
        .await?;
    state.set_transport(transport);

    // Destination diff by case-folded id. Surviving destinations keep
    // their state object; a changed address resets learned health.
    let mut next = HashMap::with_capacity(spec.destinations.len());
    for (destination_id, destination_spec) in &spec.destinations {
        let folded = destination_id.to_ascii_lowercase();
        match state.destination(&folded) {
            Some(existing) => {
                let address_changed = existing.spec().address != destination_spec.address;
                existing.set_spec(destination_spec.clone());
                if address_changed {
                    existing.reset_health();
                }
                next.insert(folded, existing);
            }
            None => {
                next.insert(
                    folded,
                    Arc::new(DestinationState::new(
                        destination_id.clone(),
                        destination_spec.clone(),
                    )),
                );
            }
        }
    }

    state.set_spec(spec.clone());
    state.set_destinations(next);
    Ok(())
}
