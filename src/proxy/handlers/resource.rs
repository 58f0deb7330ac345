//! The parametrized forwarding handler behind every dedicated API route.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::proxy::error::{extract_error_message, GatewayError};
use crate::proxy::routes::RouteSpec;
use crate::proxy::server::AppState;
use crate::proxy::upstream::outbound_headers;

/// Fill a `{name}` template from the inbound path parameters.
fn render_path(template: &str, params: &HashMap<String, String>) -> Result<String, GatewayError> {
    let mut rendered = template.to_string();
    for (name, value) in params {
        rendered = rendered.replace(&format!("{{{}}}", name), value);
    }
    if rendered.contains('{') {
        // A placeholder the route did not declare; treat as a bad request
        // rather than forwarding a broken path upstream.
        return Err(GatewayError::Validation("Invalid request path".to_string()));
    }
    Ok(rendered)
}

/// Forward one dedicated route to the upstream and normalize the response
/// per the table entry.
pub async fn forward(
    state: AppState,
    spec: &'static RouteSpec,
    params: HashMap<String, String>,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = render_path(spec.upstream, &params)?;

    let body = if spec.method == Method::GET || spec.method == Method::DELETE {
        None
    } else {
        if !body.is_empty() && serde_json::from_slice::<serde_json::Value>(&body).is_err() {
            return Err(GatewayError::Validation("Invalid JSON body".to_string()));
        }
        Some(body)
    };

    let response = state
        .upstream
        .forward(
            spec.method.clone(),
            &path,
            query.as_deref(),
            outbound_headers(&headers),
            body,
        )
        .await
        .map_err(|e| {
            tracing::warn!("Upstream call failed for {}: {}", spec.path, e);
            match spec.unreachable {
                Some(message) if e.is_connect() || e.is_timeout() => {
                    GatewayError::Unavailable(message.to_string())
                }
                _ => GatewayError::Network(spec.failure.to_string()),
            }
        })?;

    let status = response.status();
    if status.is_success() {
        let bytes = response
            .bytes()
            .await
            .map_err(|_| GatewayError::Network(spec.failure.to_string()))?;
        let out_status = if spec.created { StatusCode::CREATED } else { status };
        return Ok((
            out_status,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response());
    }

    let text = response.text().await.unwrap_or_default();
    let message = match (status, spec.not_found) {
        (StatusCode::NOT_FOUND, Some(message)) => message.to_string(),
        _ => extract_error_message(&text)
            .unwrap_or_else(|| format!("Backend error: {}", status.as_u16())),
    };
    Ok((status, Json(json!({ "error": message }))).into_response())
}
