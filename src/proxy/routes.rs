//! Static route table for the dedicated API routes.
//!
//! Each entry drives the single parametrized forwarding handler in
//! `handlers::resource`; per-route status and message overrides live here as
//! data instead of being copy-pasted into near-identical handler bodies.

use axum::http::Method;

pub struct RouteSpec {
    pub method: Method,
    /// Inbound axum route path
    pub path: &'static str,
    /// Upstream path template; `{name}` placeholders are filled from the
    /// inbound path parameters
    pub upstream: &'static str,
    /// Friendlier message replacing the upstream body on 404
    pub not_found: Option<&'static str>,
    /// Connectivity message returned with 503 when the upstream is
    /// unreachable; routes without one fall back to a generic 500
    pub unreachable: Option<&'static str>,
    /// Creation routes answer 201 on upstream success
    pub created: bool,
    /// Generic message for unexpected failures on this route
    pub failure: &'static str,
}

/// Collection route without per-id overrides.
const fn route(
    method: Method,
    path: &'static str,
    upstream: &'static str,
    failure: &'static str,
) -> RouteSpec {
    RouteSpec {
        method,
        path,
        upstream,
        not_found: None,
        unreachable: None,
        created: false,
        failure,
    }
}

/// Per-id route with a friendly 404 message.
const fn lookup(
    method: Method,
    path: &'static str,
    upstream: &'static str,
    not_found: &'static str,
    failure: &'static str,
) -> RouteSpec {
    RouteSpec {
        method,
        path,
        upstream,
        not_found: Some(not_found),
        unreachable: None,
        created: false,
        failure,
    }
}

/// Creation route; answers 201 on upstream success.
const fn create(path: &'static str, upstream: &'static str, failure: &'static str) -> RouteSpec {
    RouteSpec {
        method: Method::POST,
        path,
        upstream,
        not_found: None,
        unreachable: None,
        created: true,
        failure,
    }
}

/// Dashboard metric route; reports 503 when the upstream is unreachable.
const fn dashboard(path: &'static str, upstream: &'static str) -> RouteSpec {
    RouteSpec {
        method: Method::GET,
        path,
        upstream,
        not_found: None,
        unreachable: Some("Unable to reach the monitoring backend"),
        created: false,
        failure: "Failed to load dashboard data",
    }
}

pub static ROUTES: &[RouteSpec] = &[
    // Bins
    route(Method::GET, "/api/bins", "bins", "Failed to fetch bins"),
    create("/api/bins", "bins", "Failed to create bin"),
    lookup(
        Method::GET,
        "/api/bins/:id",
        "bins/{id}",
        "Bin not found",
        "Failed to fetch bin",
    ),
    lookup(
        Method::PUT,
        "/api/bins/:id",
        "bins/{id}",
        "Bin not found",
        "Failed to update bin",
    ),
    lookup(
        Method::DELETE,
        "/api/bins/:id",
        "bins/{id}",
        "Bin not found",
        "Failed to delete bin",
    ),
    lookup(
        Method::POST,
        "/api/bins/:id/clear",
        "bins/{id}/clear",
        "Bin not found",
        "Failed to clear bin",
    ),
    // Clients
    route(Method::GET, "/api/clients", "clients", "Failed to fetch clients"),
    create("/api/clients", "clients", "Failed to create client"),
    lookup(
        Method::PUT,
        "/api/clients/:id",
        "clients/{id}",
        "Client not found",
        "Failed to update client",
    ),
    lookup(
        Method::GET,
        "/api/clients/:id/activity",
        "clients/{id}/activity",
        "Client not found",
        "Failed to fetch client activity",
    ),
    lookup(
        Method::GET,
        "/api/clients/:id/activity/history",
        "clients/{id}/activity/history",
        "Client not found",
        "Failed to fetch client activity history",
    ),
    lookup(
        Method::PUT,
        "/api/clients/:id/status",
        "clients/{id}/status",
        "Client not found",
        "Failed to update client status",
    ),
    // Usage and clearing transactions
    route(
        Method::GET,
        "/api/bin-usages",
        "bin-usages",
        "Failed to fetch bin usages",
    ),
    route(Method::GET, "/api/clearings", "clearings", "Failed to fetch clearings"),
    // Users
    route(Method::GET, "/api/users", "users", "Failed to fetch users"),
    create("/api/users", "users", "Failed to create user"),
    lookup(
        Method::GET,
        "/api/users/:id",
        "users/{id}",
        "User not found",
        "Failed to fetch user",
    ),
    lookup(
        Method::PUT,
        "/api/users/:id",
        "users/{id}",
        "User not found",
        "Failed to update user",
    ),
    lookup(
        Method::DELETE,
        "/api/users/:id",
        "users/{id}",
        "User not found",
        "Failed to delete user",
    ),
    lookup(
        Method::GET,
        "/api/users/clients/:id",
        "users/clients/{id}",
        "Client not found",
        "Failed to fetch client account",
    ),
    create(
        "/api/users/create-client",
        "users/create-client",
        "Failed to create client account",
    ),
    // Auth passthrough (sign-in/sign-out have dedicated handlers)
    route(
        Method::POST,
        "/api/auth/refresh",
        "auth/refresh",
        "Token refresh failed",
    ),
    route(
        Method::POST,
        "/api/auth/validate",
        "auth/validate",
        "Token validation failed",
    ),
    route(
        Method::GET,
        "/api/auth/status",
        "auth/status",
        "Failed to fetch auth status",
    ),
    // Dashboard metrics
    dashboard("/api/dashboard/active-bins", "dashboard/active-bins"),
    dashboard("/api/dashboard/active-cards", "dashboard/active-cards"),
    dashboard("/api/dashboard/current-usage", "dashboard/current-usage"),
    dashboard(
        "/api/dashboard/bin-status-distribution",
        "dashboard/bin-status-distribution",
    ),
    dashboard("/api/dashboard/getDistrict", "dashboard/getDistrict"),
    dashboard("/api/dashboard/getKhoroo", "dashboard/getKhoroo"),
    dashboard("/api/dashboard/khoroo-usage", "dashboard/khoroo-usage"),
    dashboard("/api/dashboard/location-stats", "dashboard/location-stats"),
    dashboard("/api/dashboard/all-bins", "dashboard/all-bins"),
    dashboard(
        "/api/dashboard/client-type-counts",
        "dashboard/client-type-counts",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_no_duplicate_method_path_pairs() {
        let mut seen = HashSet::new();
        for spec in ROUTES {
            assert!(
                seen.insert((spec.method.clone(), spec.path)),
                "duplicate route {} {}",
                spec.method,
                spec.path
            );
        }
    }

    #[test]
    fn creation_routes_are_posts() {
        for spec in ROUTES.iter().filter(|s| s.created) {
            assert_eq!(spec.method, Method::POST, "{}", spec.path);
        }
    }

    #[test]
    fn templates_only_reference_declared_params() {
        for spec in ROUTES {
            if spec.upstream.contains("{id}") {
                assert!(spec.path.contains(":id"), "{}", spec.path);
            }
        }
    }
}
