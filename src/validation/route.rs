//! Route specification validation.

use crate::config::{ValidationError, ValidationErrorKind};
use crate::domain::{HeaderMatchMode, RouteSpec};
use crate::validation::{validate_host_name, PolicyRegistry, RoutePatternParser, SUPPORTED_METHODS};

const RESERVED_AUTHORIZATION_POLICIES: [&str; 2] = ["Default", "Anonymous"];
const RESERVED_CORS_POLICIES: [&str; 2] = ["Default", "Disable"];

/// Checks one route, accumulating all failures. Never panics and never
/// stops at the first problem.
pub fn validate_route(
    route: &RouteSpec,
    registry: &dyn PolicyRegistry,
    patterns: &dyn RoutePatternParser,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let route_id = route.route_id.as_str();

    if route_id.is_empty() {
        errors.push(ValidationError::route(
            ValidationErrorKind::MissingRouteId,
            route_id,
            "Missing route id.",
        ));
    }

    validate_match(route, &mut errors, patterns);
    validate_authorization_policy(route, &mut errors, registry);
    validate_cors_policy(route, &mut errors, registry);

    for transform in &route.transforms {
        for message in registry.validate_transform(transform) {
            errors.push(ValidationError::route(
                ValidationErrorKind::InvalidTransform,
                route_id,
                message,
            ));
        }
    }

    errors
}

fn missing_hosts_or_path(route_id: &str) -> ValidationError {
    ValidationError::route(
        ValidationErrorKind::MissingMatch,
        route_id,
        format!(
            "Route '{}' requires Hosts or Path specified. Set the Path to '/{{**catchall}}' to match all requests.",
            route_id
        ),
    )
}

fn validate_match(
    route: &RouteSpec,
    errors: &mut Vec<ValidationError>,
    patterns: &dyn RoutePatternParser,
) {
    let route_id = route.route_id.as_str();
    let Some(route_match) = route.route_match.as_ref() else {
        errors.push(missing_hosts_or_path(route_id));
        return;
    };

    let hosts: Vec<&String> = route_match.hosts.iter().filter(|h| !h.is_empty()).collect();
    let path = route_match.path.as_deref().filter(|p| !p.is_empty());

    if hosts.is_empty() && path.is_none() {
        errors.push(missing_hosts_or_path(route_id));
    }

    for host in hosts {
        if let Err(reason) = validate_host_name(host) {
            errors.push(ValidationError::route(
                ValidationErrorKind::InvalidHost,
                route_id,
                format!("Invalid host name '{}' for route '{}': {}", host, route_id, reason),
            ));
        }
    }

    if let Some(path) = path {
        if patterns.parse(path).is_err() {
            errors.push(ValidationError::route(
                ValidationErrorKind::InvalidPath,
                route_id,
                format!("Invalid path '{}' for route '{}'", path, route_id),
            ));
        }
    }

    let mut seen_methods = Vec::new();
    for method in &route_match.methods {
        let normalized = method.to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&normalized.as_str()) {
            errors.push(ValidationError::route(
                ValidationErrorKind::InvalidMethod,
                route_id,
                format!("Unsupported HTTP method '{}' for route '{}'", method, route_id),
            ));
        } else if seen_methods.contains(&normalized) {
            errors.push(ValidationError::route(
                ValidationErrorKind::DuplicateMethod,
                route_id,
                format!("Duplicate HTTP method '{}' for route '{}'", normalized, route_id),
            ));
        } else {
            seen_methods.push(normalized);
        }
    }

    for header in &route_match.headers {
        if header.name.is_empty() {
            errors.push(ValidationError::route(
                ValidationErrorKind::InvalidHeaderMatch,
                route_id,
                format!("A header match for route '{}' is missing a header name", route_id),
            ));
        }
        match header.mode {
            HeaderMatchMode::Exists => {
                if !header.values.is_empty() {
                    errors.push(ValidationError::route(
                        ValidationErrorKind::InvalidHeaderMatch,
                        route_id,
                        format!(
                            "Header match mode 'Exists' on route '{}' must not specify header values",
                            route_id
                        ),
                    ));
                }
            }
            mode => {
                if header.values.is_empty() {
                    errors.push(ValidationError::route(
                        ValidationErrorKind::InvalidHeaderMatch,
                        route_id,
                        format!(
                            "Header match mode '{}' on route '{}' requires at least one header value",
                            mode, route_id
                        ),
                    ));
                }
            }
        }
    }
}

fn validate_authorization_policy(
    route: &RouteSpec,
    errors: &mut Vec<ValidationError>,
    registry: &dyn PolicyRegistry,
) {
    let route_id = route.route_id.as_str();
    let Some(policy) = route.authorization_policy.as_deref().filter(|p| !p.is_empty()) else {
        return;
    };

    let reserved =
        RESERVED_AUTHORIZATION_POLICIES.iter().any(|r| policy.eq_ignore_ascii_case(r));
    let registered = registry.is_authorization_policy_registered(policy);

    if reserved && registered {
        errors.push(ValidationError::route(
            ValidationErrorKind::PolicyConflict,
            route_id,
            format!(
                "The application has registered an authorization policy named '{}' that conflicts with the reserved authorization policy name used on route '{}'",
                policy, route_id
            ),
        ));
    } else if !reserved && !registered {
        errors.push(ValidationError::route(
            ValidationErrorKind::PolicyNotFound,
            route_id,
            format!("Authorization policy '{}' not found for route '{}'", policy, route_id),
        ));
    }
}

fn validate_cors_policy(
    route: &RouteSpec,
    errors: &mut Vec<ValidationError>,
    registry: &dyn PolicyRegistry,
) {
    let route_id = route.route_id.as_str();
    let Some(policy) = route.cors_policy.as_deref().filter(|p| !p.is_empty()) else {
        return;
    };

    let reserved = RESERVED_CORS_POLICIES.iter().any(|r| policy.eq_ignore_ascii_case(r));
    let registered = registry.is_cors_policy_registered(policy);

    if reserved && registered {
        errors.push(ValidationError::route(
            ValidationErrorKind::PolicyConflict,
            route_id,
            format!(
                "The application has registered a CORS policy named '{}' that conflicts with the reserved CORS policy name used on route '{}'",
                policy, route_id
            ),
        ));
    } else if !reserved && !registered {
        errors.push(ValidationError::route(
            ValidationErrorKind::PolicyNotFound,
            route_id,
            format!("CORS policy '{}' not found for route '{}'", policy, route_id),
        ));
    }
}
