//! Generic catch-all proxy for upstream paths without a dedicated route.
//!
//! Resource prefixes that have dedicated, more-validated routes are blocked
//! here so the catch-all can never shadow them.

use axum::{
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method},
    response::Response,
};

use crate::proxy::error::GatewayError;
use crate::proxy::server::AppState;

/// Prefixes that must go through their dedicated API routes.
const BLOCKED_PREFIXES: &[&str] = &[
    "clients/",
    "bins/",
    "users/",
    "auth/",
    "analytics/",
    "dashboard/",
    "transactions/",
    "cards/",
    "clearings/",
    "bin-usages/",
];

/// Inbound headers the proxy is willing to forward.
const FORWARDED_HEADERS: &[header::HeaderName] = &[
    header::CONTENT_TYPE,
    header::AUTHORIZATION,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
];

pub fn is_blocked(path: &str) -> bool {
    BLOCKED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix) || path == prefix.trim_end_matches('/'))
}

fn allowlisted_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = inbound.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    if let Some(value) = inbound.get("x-forwarded-for") {
        headers.insert(header::HeaderName::from_static("x-forwarded-for"), value.clone());
    }
    headers
}

pub async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = path.trim_start_matches('/').to_string();

    if is_blocked(&path) {
        return Err(GatewayError::NotFound(format!(
            "'{}' should use dedicated API routes, not proxy",
            path
        )));
    }

    let body = if body.is_empty() { None } else { Some(body) };
    let response = state
        .upstream
        .forward(
            method,
            &path,
            query.as_deref(),
            allowlisted_headers(&headers),
            body,
        )
        .await
        .map_err(|e| {
            tracing::warn!("Proxy request failed for '{}': {}", path, e);
            GatewayError::Network("Proxy request failed".to_string())
        })?;

    let status = response.status();

    // The body is re-materialized below, so encoding and length headers from
    // the upstream no longer apply.
    let mut out_headers = response.headers().clone();
    out_headers.remove(header::CONTENT_ENCODING);
    out_headers.remove(header::CONTENT_LENGTH);
    out_headers.remove(header::TRANSFER_ENCODING);

    let bytes = response
        .bytes()
        .await
        .map_err(|_| GatewayError::Network("Proxy request failed".to_string()))?;

    let mut out = Response::new(Body::from(bytes));
    *out.status_mut() = status;
    *out.headers_mut() = out_headers;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedicated_resource_prefixes_are_blocked() {
        assert!(is_blocked("bins/5"));
        assert!(is_blocked("bins"));
        assert!(is_blocked("auth/signin"));
        assert!(is_blocked("bin-usages/today"));
        assert!(is_blocked("dashboard/active-bins"));
    }

    #[test]
    fn other_paths_pass() {
        assert!(!is_blocked("firmware/version"));
        assert!(!is_blocked("binoculars")); // prefix match must not catch this
        assert!(!is_blocked("health"));
    }

    #[test]
    fn allowlist_drops_unknown_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, "application/json".parse().unwrap());
        inbound.insert(header::COOKIE, "auth-token=authenticated".parse().unwrap());
        inbound.insert("x-forwarded-for", "10.0.0.7".parse().unwrap());

        let forwarded = allowlisted_headers(&inbound);
        assert!(forwarded.get(header::ACCEPT).is_some());
        assert!(forwarded.get("x-forwarded-for").is_some());
        assert!(forwarded.get(header::COOKIE).is_none());
    }
}
