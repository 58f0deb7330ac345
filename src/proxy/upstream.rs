// Upstream client: the one pooled HTTP client every forwarded request goes
// through.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use reqwest::{Client, Response};
use tokio::time::Duration;

pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
}

impl UpstreamClient {
    /// Build the client with pooled connections and a uniform request
    /// timeout. The timeout applies to every outbound call.
    pub fn new(base_url: String, request_timeout_secs: u64) -> Result<Self, String> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(base_url: &str, path: &str, query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        match query {
            Some(qs) if !qs.is_empty() => format!("{}/{}?{}", base_url, path, qs),
            _ => format!("{}/{}", base_url, path),
        }
    }

    /// Forward a request with pre-built outbound headers and an optional raw
    /// body. The query string is attached verbatim.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, reqwest::Error> {
        let url = Self::build_url(&self.base_url, path, query);
        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(bytes) = body {
            request = request.body(bytes);
        }
        request.send().await
    }
}

/// Outbound header set for dedicated routes: JSON content type plus the
/// caller's `Authorization` header passed through unchanged. The gateway
/// never synthesizes an `Authorization` header.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    if let Some(authorization) = inbound.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, authorization.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let base = "http://bins.example.com:8080";

        assert_eq!(
            UpstreamClient::build_url(base, "bins/5", None),
            "http://bins.example.com:8080/bins/5"
        );
        assert_eq!(
            UpstreamClient::build_url(base, "/bin-usages", Some("page=2&size=20")),
            "http://bins.example.com:8080/bin-usages?page=2&size=20"
        );
        assert_eq!(
            UpstreamClient::build_url(base, "clearings", Some("")),
            "http://bins.example.com:8080/clearings"
        );
    }

    #[test]
    fn outbound_headers_pass_authorization_through() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_static("Bearer abc"),
        );
        inbound.insert("x-custom", header::HeaderValue::from_static("nope"));

        let outbound = outbound_headers(&inbound);
        assert_eq!(
            outbound.get(header::AUTHORIZATION).unwrap(),
            "Bearer abc"
        );
        assert_eq!(
            outbound.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(outbound.get("x-custom").is_none());
    }

    #[test]
    fn outbound_headers_never_synthesize_authorization() {
        let outbound = outbound_headers(&HeaderMap::new());
        assert!(outbound.get(header::AUTHORIZATION).is_none());
    }
}
