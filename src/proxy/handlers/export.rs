//! Excel export routes. The upstream body is an opaque blob; only the
//! filename is lifted from its `content-disposition` header.

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::proxy::error::{extract_error_message, GatewayError};
use crate::proxy::server::AppState;
use crate::proxy::upstream::outbound_headers;

const EXCEL_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Pull `filename=` out of a content-disposition header value.
fn parse_filename(disposition: &str) -> Option<String> {
    disposition.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

async fn export(
    state: AppState,
    kind: &str,
    default_filename: &str,
    query: Option<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let path = format!("export/{}/excel", kind);
    let response = state
        .upstream
        .forward(
            Method::GET,
            &path,
            query.as_deref(),
            outbound_headers(&headers),
            None,
        )
        .await
        .map_err(|e| {
            tracing::warn!("Export request failed for {}: {}", kind, e);
            GatewayError::Network(format!("Failed to export {}", kind))
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = extract_error_message(&text)
            .unwrap_or_else(|| format!("Backend error: {}", status.as_u16()));
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    let filename = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_filename)
        .unwrap_or_else(|| default_filename.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|_| GatewayError::Network(format!("Failed to export {}", kind)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, EXCEL_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn export_bins(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    export(state, "bins", "bins.xlsx", query, headers).await
}

pub async fn export_cards(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    export(state, "cards", "cards.xlsx", query, headers).await
}
