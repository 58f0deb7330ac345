//! Navigation gate over the session flag cookie.
//!
//! This is a UX fast-path, not a security boundary: it only checks cookie
//! presence and equality against a sentinel. Real authorization is enforced
//! by the upstream on every forwarded API call.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::modules::session::{SESSION_COOKIE_NAME, SESSION_COOKIE_VALUE};

/// Paths the gate never touches.
fn is_protected_path(path: &str) -> bool {
    // API routes carry their own bearer token, checked upstream per call
    if path.starts_with("/api/") {
        return false;
    }

    if is_static_asset(path) {
        return false;
    }

    // Sign-in / sign-up pages
    if path == "/login" || path == "/login.html" || path == "/signup" || path == "/signup.html" {
        return false;
    }

    // Health check
    if path == "/healthz" {
        return false;
    }

    // Everything else is dashboard navigation
    true
}

fn is_static_asset(path: &str) -> bool {
    // HTML pages are navigation, not assets
    if path.ends_with(".html") {
        return false;
    }

    if path == "/favicon.ico" || path.starts_with("/assets/") {
        return true;
    }

    matches!(
        path.rsplit('.').next(),
        Some("css")
            | Some("js")
            | Some("png")
            | Some("svg")
            | Some("jpg")
            | Some("jpeg")
            | Some("webp")
            | Some("ico")
            | Some("woff")
            | Some("woff2")
            | Some("ttf")
    )
}

/// Read the session flag cookie value, if any.
fn extract_session_flag(request: &Request) -> Option<String> {
    let cookie_header = request.headers().get(header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
            return Some(value.to_string());
        }
    }

    None
}

pub async fn access_gate_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    if !is_protected_path(&path) {
        return next.run(request).await;
    }

    if let Some(flag) = extract_session_flag(&request) {
        if flag == SESSION_COOKIE_VALUE {
            return next.run(request).await;
        }
        tracing::debug!("access gate: stale session flag for {}", path);
    }

    tracing::debug!("access gate: unauthenticated navigation to {}, redirecting", path);
    let redirect: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    Redirect::to(&format!("/login?redirect={}", redirect)).into_response()
}
