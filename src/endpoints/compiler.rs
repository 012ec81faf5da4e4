//! Compilation of validated routes into matcher endpoints.

use std::sync::Arc;

use tracing::debug;

use crate::domain::RouteSpec;
use crate::endpoints::{
    AuthorizationMarker, CorsMarker, Endpoint, EndpointMetadata, Extensions, MethodsMetadata,
    CATCH_ALL_PATTERN,
};
use crate::runtime::ClusterState;

/// User hook invoked over every endpoint after compilation, in
/// registration order. Conventions may adjust fields or attach extension
/// metadata.
pub trait EndpointConvention: Send + Sync {
    fn apply(&self, endpoint: &mut Endpoint);
}

/// Turns validated routes and resolved cluster state into endpoints.
#[derive(Default)]
pub struct EndpointCompiler {
    conventions: Vec<Arc<dyn EndpointConvention>>,
}

impl EndpointCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conventions(conventions: Vec<Arc<dyn EndpointConvention>>) -> Self {
        Self { conventions }
    }

    pub fn compile(&self, route: &RouteSpec, cluster: Option<Arc<ClusterState>>) -> Endpoint {
        let route = Arc::new(route.clone());
        let route_match = route.route_match.as_ref();

        let pattern = route_match
            .and_then(|m| m.path.as_deref())
            .filter(|p| !p.is_empty())
            .unwrap_or(CATCH_ALL_PATTERN)
            .to_string();

        let hosts = route_match
            .map(|m| {
                m.hosts.iter().filter(|h| !h.is_empty()).cloned().collect::<Vec<String>>()
            })
            .filter(|hosts| !hosts.is_empty());

        let headers = route_match.map(|m| m.headers.clone()).filter(|h| !h.is_empty());

        let cors = match route.cors_policy.as_deref() {
            None | Some("") => None,
            Some(policy) if policy.eq_ignore_ascii_case("default") => Some(CorsMarker::DefaultEnable),
            Some(policy) if policy.eq_ignore_ascii_case("disable") => Some(CorsMarker::Disable),
            Some(policy) => Some(CorsMarker::Named(policy.to_string())),
        };

        let authorization = match route.authorization_policy.as_deref() {
            None | Some("") => None,
            Some(policy) if policy.eq_ignore_ascii_case("default") => {
                Some(AuthorizationMarker::Default)
            }
            Some(policy) if policy.eq_ignore_ascii_case("anonymous") => {
                Some(AuthorizationMarker::Anonymous)
            }
            Some(policy) => Some(AuthorizationMarker::Named(policy.to_string())),
        };

        let methods = route_match
            .map(|m| m.methods.iter().map(|method| method.to_ascii_uppercase()).collect::<Vec<_>>())
            .filter(|methods: &Vec<String>| !methods.is_empty())
            .map(|methods| MethodsMetadata { methods, accepts_cors_preflight: cors.is_some() });

        if cluster.is_none() && !route.cluster_id.is_empty() {
            debug!(
                route_id = %route.route_id,
                cluster_id = %route.cluster_id,
                "Compiling endpoint without a resolved cluster"
            );
        }

        let mut endpoint = Endpoint {
            pattern,
            order: route.order,
            display_name: route.route_id.clone(),
            metadata: EndpointMetadata {
                route,
                hosts,
                headers,
                methods,
                cors,
                authorization,
                cluster,
                extensions: Extensions::default(),
            },
        };

        for convention in &self.conventions {
            convention.apply(&mut endpoint);
        }

        endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HeaderMatch, RouteMatch};

    fn compile(route: &RouteSpec) -> Endpoint {
        EndpointCompiler::new().compile(route, None)
    }

    #[test]
    fn path_route_compiles_to_its_pattern() {
        let route = RouteSpec::new("r1").with_cluster("c1").with_match(RouteMatch::path("/"));
        let endpoint = compile(&route);

        assert_eq!(endpoint.pattern, "/");
        assert_eq!(endpoint.display_name, "r1");
        assert!(endpoint.metadata.hosts.is_none());
        assert!(endpoint.metadata.headers.is_none());
        assert!(endpoint.metadata.methods.is_none());
        assert!(endpoint.metadata.cors.is_none());
        assert!(endpoint.metadata.authorization.is_none());
        assert!(endpoint.metadata.cluster.is_none());
    }

    #[test]
    fn hosts_only_route_gets_the_catch_all_pattern() {
        let route = RouteSpec::new("r1").with_match(RouteMatch::hosts(["example.com"]));
        let endpoint = compile(&route);

        assert_eq!(endpoint.pattern, "/{**catchall}");
        assert_eq!(endpoint.metadata.hosts, Some(vec!["example.com".to_string()]));
    }

    #[test]
    fn empty_host_strings_do_not_produce_host_metadata() {
        let route = RouteSpec::new("r1")
            .with_match(RouteMatch { hosts: vec![String::new()], path: Some("/".into()), ..Default::default() });
        let endpoint = compile(&route);
        assert!(endpoint.metadata.hosts.is_none());
    }

    #[test]
    fn order_is_carried_through() {
        let route = RouteSpec::new("r1").with_match(RouteMatch::path("/")).with_order(-3);
        assert_eq!(compile(&route).order, Some(-3));
    }

    #[test]
    fn methods_are_normalized_and_marked_for_preflight_with_cors() {
        let mut route =
            RouteSpec::new("r1").with_match(RouteMatch::path("/").with_methods(["get", "Post"]));
        route.cors_policy = Some("Disable".to_string());

        let endpoint = compile(&route);
        let methods = endpoint.metadata.methods.clone().expect("methods metadata present");
        assert_eq!(methods.methods, vec!["GET".to_string(), "POST".to_string()]);
        assert!(methods.accepts_cors_preflight);
        assert_eq!(endpoint.metadata.cors, Some(CorsMarker::Disable));
        assert!(endpoint.metadata.accepts_cors_preflight());
    }

    #[test]
    fn methods_without_cors_do_not_accept_preflight() {
        let route =
            RouteSpec::new("r1").with_match(RouteMatch::path("/").with_methods(["GET"]));
        let endpoint = compile(&route);
        let methods = endpoint.metadata.methods.clone().expect("methods metadata present");
        assert!(!methods.accepts_cors_preflight);
        assert!(!endpoint.metadata.accepts_cors_preflight());
    }

    #[test]
    fn cors_and_authorization_markers() {
        let mut route = RouteSpec::new("r1").with_match(RouteMatch::path("/"));
        route.cors_policy = Some("frontend".to_string());
        route.authorization_policy = Some("anonymous".to_string());

        let endpoint = compile(&route);
        assert_eq!(endpoint.metadata.cors, Some(CorsMarker::Named("frontend".to_string())));
        assert_eq!(endpoint.metadata.authorization, Some(AuthorizationMarker::Anonymous));
    }

    #[test]
    fn header_matches_are_attached() {
        let route = RouteSpec::new("r1")
            .with_match(RouteMatch::path("/").with_header(HeaderMatch::exact("x-tenant", "acme")));
        let endpoint = compile(&route);
        let headers = endpoint.metadata.headers.expect("header metadata present");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name, "x-tenant");
    }

    #[test]
    fn conventions_run_in_order_and_may_attach_extensions() {
        struct Stamp(&'static str);

        struct First;
        impl EndpointConvention for First {
            fn apply(&self, endpoint: &mut Endpoint) {
                endpoint.metadata.extensions.insert(Stamp("first"));
            }
        }

        struct Second;
        impl EndpointConvention for Second {
            fn apply(&self, endpoint: &mut Endpoint) {
                endpoint.metadata.extensions.insert(Stamp("second"));
            }
        }

        let compiler =
            EndpointCompiler::with_conventions(vec![Arc::new(First), Arc::new(Second)]);
        let route = RouteSpec::new("r1").with_match(RouteMatch::path("/"));
        let endpoint = compiler.compile(&route, None);

        assert_eq!(endpoint.metadata.extensions.get::<Stamp>().map(|s| s.0), Some("second"));
    }

    #[test]
    fn original_route_spec_is_attached() {
        let route = RouteSpec::new("r1").with_cluster("c1").with_match(RouteMatch::path("/api"));
        let endpoint = compile(&route);
        assert_eq!(endpoint.metadata.route.cluster_id, "c1");
        assert_eq!(
            endpoint.metadata.route.route_match.as_ref().and_then(|m| m.path.as_deref()),
            Some("/api")
        );
    }
}
