//! End-to-end tests for cluster runtime identity, health tracking, and
//! transport reuse across configuration reloads.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use switchyard::domain::{ClusterSpec, DestinationSpec, HttpClientOptions, RouteMatch, RouteSpec};
use switchyard::runtime::DestinationHealth;
use switchyard::validation::{EmptyPolicyRegistry, Validator};
use switchyard::{ConfigManager, InMemoryConfigProvider};

fn route_to(cluster_id: &str) -> RouteSpec {
    RouteSpec::new("r1").with_cluster(cluster_id).with_match(RouteMatch::path("/"))
}

fn cluster(id: &str, destinations: &[(&str, &str)]) -> ClusterSpec {
    let mut spec = ClusterSpec::new(id);
    for (destination_id, address) in destinations {
        spec = spec.with_destination(*destination_id, DestinationSpec::new(*address));
    }
    spec
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future).await.expect("operation timed out")
}

async fn loaded_manager(
    provider: &Arc<InMemoryConfigProvider>,
) -> Arc<ConfigManager> {
    let manager = Arc::new(ConfigManager::new(
        Arc::clone(provider) as Arc<dyn switchyard::ConfigProvider>,
        Validator::new(Arc::new(EmptyPolicyRegistry)),
    ));
    manager.initial_load().await.expect("initial load succeeds");
    manager
}

async fn reload(provider: &InMemoryConfigProvider, manager: &Arc<ConfigManager>, routes: Vec<RouteSpec>, clusters: Vec<ClusterSpec>) {
    let token = manager.change_token();
    provider.update(routes, clusters);
    within(token.changed()).await;
}

#[tokio::test]
async fn cluster_state_identity_survives_reloads() {
    let provider = Arc::new(InMemoryConfigProvider::new(
        vec![route_to("c1")],
        vec![cluster("c1", &[("d1", "http://a/")])],
    ));
    let manager = loaded_manager(&provider).await;

    let before = manager.snapshot().cluster("c1").expect("cluster exists");

    reload(
        &provider,
        &manager,
        vec![route_to("c1")],
        vec![cluster("c1", &[("d1", "http://a/"), ("d2", "http://b/")])],
    )
    .await;

    let after = manager.snapshot().cluster("c1").expect("cluster still exists");
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.dynamic_state().all_destinations.len(), 2);

    manager.shutdown();
}

#[tokio::test]
async fn destination_health_survives_reloads_until_the_address_changes() {
    let provider = Arc::new(InMemoryConfigProvider::new(
        vec![route_to("c1")],
        vec![cluster("c1", &[("d1", "http://a/")])],
    ));
    let manager = loaded_manager(&provider).await;

    let state = manager.snapshot().cluster("c1").expect("cluster exists");
    state.set_destination_health("d1", DestinationHealth::Unhealthy);
    assert!(state.dynamic_state().available_destinations.is_empty());

    // Same address: the learned health persists.
    reload(&provider, &manager, vec![route_to("c1")], vec![{
        let mut spec = cluster("c1", &[("d1", "http://a/")]);
        spec.metadata.insert("generation".to_string(), "2".to_string());
        spec
    }])
    .await;
    let d1 = state.destination("d1").expect("d1 exists");
    assert_eq!(d1.health(), DestinationHealth::Unhealthy);

    // Changed address: health resets and the destination is available
    // again until probes say otherwise.
    reload(&provider, &manager, vec![route_to("c1")], vec![cluster("c1", &[("d1", "http://a2/")])])
        .await;
    assert_eq!(d1.health(), DestinationHealth::Unknown);
    assert_eq!(state.dynamic_state().available_destinations.len(), 1);

    manager.shutdown();
}

#[tokio::test]
async fn transports_are_reused_when_options_match() {
    let options =
        HttpClientOptions { max_connections_per_server: Some(4), ..Default::default() };

    let mut spec = cluster("c1", &[("d1", "http://a/")]);
    spec.http_client = Some(options.clone());
    let provider =
        Arc::new(InMemoryConfigProvider::new(vec![route_to("c1")], vec![spec]));
    let manager = loaded_manager(&provider).await;

    let state = manager.snapshot().cluster("c1").expect("cluster exists");
    let first = state.transport();

    // Reload with structurally equal options: same handle.
    let mut spec = cluster("c1", &[("d1", "http://a/"), ("d2", "http://b/")]);
    spec.http_client = Some(options);
    reload(&provider, &manager, vec![route_to("c1")], vec![spec]).await;
    assert!(Arc::ptr_eq(&first, &state.transport()));

    // Reload with different options: the handle is rebuilt and the old
    // one drains.
    let mut spec = cluster("c1", &[("d1", "http://a/"), ("d2", "http://b/")]);
    spec.http_client = Some(HttpClientOptions {
        max_connections_per_server: Some(8),
        ..Default::default()
    });
    reload(&provider, &manager, vec![route_to("c1")], vec![spec]).await;

    let second = state.transport();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.is_draining());
    assert!(!second.is_draining());

    manager.shutdown();
}

#[tokio::test]
async fn removed_cluster_is_retired_but_old_snapshots_keep_working() {
    let provider = Arc::new(InMemoryConfigProvider::new(
        vec![route_to("c1")],
        vec![cluster("c1", &[("d1", "http://a/")])],
    ));
    let manager = loaded_manager(&provider).await;

    let old_snapshot = manager.snapshot();
    let state = old_snapshot.cluster("c1").expect("cluster exists");

    reload(&provider, &manager, Vec::new(), Vec::new()).await;

    assert!(state.is_retired());
    assert!(state.transport().is_draining());
    assert!(manager.snapshot().cluster("c1").is_none());

    // Readers holding the old snapshot still resolve the cluster and its
    // destinations.
    let held = old_snapshot.cluster("c1").expect("old snapshot still resolves");
    assert_eq!(held.dynamic_state().all_destinations.len(), 1);

    manager.shutdown();
}

#[tokio::test]
async fn cluster_change_token_fires_on_destination_changes() {
    let provider = Arc::new(InMemoryConfigProvider::new(
        vec![route_to("c1")],
        vec![cluster("c1", &[("d1", "http://a/")])],
    ));
    let manager = loaded_manager(&provider).await;

    let state = manager.snapshot().cluster("c1").expect("cluster exists");
    let token = state.change_token();

    reload(&provider, &manager, vec![route_to("c1")], vec![cluster("c1", &[("d1", "http://a/"), ("d2", "http://b/")])])
        .await;

    assert!(token.has_changed());
    assert!(!state.change_token().has_changed());

    manager.shutdown();
}
