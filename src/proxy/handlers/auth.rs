//! Sign-in and sign-out. These two need custom handling: field validation,
//! per-status error messages, and the session flag cookie.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::modules::session::{clear_session_cookie, session_cookie};
use crate::proxy::server::AppState;
use crate::proxy::upstream::outbound_headers;

#[derive(Deserialize)]
pub struct SigninRequest {
    username: Option<String>,
    password: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn with_cookie(mut response: Response, cookie: String) -> Response {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

pub async fn signin(State(state): State<AppState>, body: Bytes) -> Response {
    // Parsed by hand instead of the Json extractor so a malformed or
    // non-JSON body still gets the uniform {"error": ...} shape.
    let payload: SigninRequest = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON body"),
    };

    let (username, password) = match (
        payload.username.filter(|u| !u.trim().is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) {
        (Some(username), Some(password)) => (username, password),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Username and password are required",
            )
        }
    };

    let body = json!({ "username": username, "password": password });
    let response = match state
        .upstream
        .forward(
            Method::POST,
            "auth/signin",
            None,
            outbound_headers(&HeaderMap::new()),
            Some(body.to_string().into()),
        )
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Sign-in request to upstream failed: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error during authentication",
            );
        }
    };

    let status = response.status();
    if !status.is_success() {
        let message = match status {
            StatusCode::UNAUTHORIZED => "Invalid username or password".to_string(),
            StatusCode::FORBIDDEN => "Access forbidden".to_string(),
            StatusCode::NOT_FOUND => "Authentication endpoint not found".to_string(),
            other => format!(
                "Backend error: {} {}",
                other.as_u16(),
                other.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        };
        return error_response(status, message);
    }

    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Sign-in response was not valid JSON: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No valid response received from backend",
            );
        }
    };

    if body.get("token").and_then(|t| t.as_str()).is_none() {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No valid response received from backend",
        );
    }

    tracing::info!("User signed in");
    with_cookie(
        (StatusCode::OK, Json(body)).into_response(),
        session_cookie(),
    )
}

/// Sign-out never fails from the caller's point of view: local state must be
/// clearable even when the upstream is down. The upstream call is
/// best-effort.
pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = state
        .upstream
        .forward(
            Method::POST,
            "auth/signout",
            None,
            outbound_headers(&headers),
            None,
        )
        .await
    {
        tracing::debug!("Upstream sign-out failed, ignoring: {}", e);
    }

    with_cookie(
        (StatusCode::OK, Json(json!({ "message": "Logged out successfully" }))).into_response(),
        clear_session_cookie(),
    )
}
