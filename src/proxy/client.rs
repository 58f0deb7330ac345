//! Authenticated API client used by the dashboard runtime.
//!
//! Wraps outbound calls with bearer injection and a single automatic retry
//! after a token refresh. Concurrent requests whose token was rejected
//! collapse onto one refresh call: the refresh gate serializes them, and a
//! waiter that finds the stored token already replaced reuses it instead of
//! refreshing again.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use tokio::time::Duration;

use crate::modules::session::{AuthResponse, SessionStore};
use crate::proxy::error::{extract_error_message, GatewayError};

/// Default client-side request timeout, enforced on every call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Exchange a refresh token for fresh credentials. A trait seam so the
/// single-flight behavior is testable with a counting fake.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, GatewayError>;
}

/// Production refresher: POSTs the refresh token to the gateway.
pub struct HttpRefresher {
    http: Client,
    refresh_url: String,
}

impl HttpRefresher {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            refresh_url: format!("{}/api/auth/refresh", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, GatewayError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Auth(format!(
                "Token refresh rejected with status {}",
                status.as_u16()
            )));
        }

        response
            .json::<AuthResponse>()
            .await
            .map_err(|e| GatewayError::Auth(format!("Invalid refresh response: {}", e)))
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;
        let refresher = Arc::new(HttpRefresher::new(http.clone(), base_url));
        Ok(Self::with_refresher(base_url, session, http, refresher))
    }

    pub fn with_refresher(
        base_url: &str,
        session: Arc<SessionStore>,
        http: Client,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            refresher,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        self.request(Method::GET, path, None, true).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        self.request(Method::POST, path, Some(body), true).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        self.request(Method::PUT, path, Some(body), true).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, GatewayError> {
        self.request(Method::DELETE, path, None, true).await
    }

    /// Perform a call with at most one refresh-and-retry cycle.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        require_auth: bool,
    ) -> Result<Value, GatewayError> {
        let mut attempted_refresh = false;

        loop {
            let token = self.session.token();

            let mut request = self
                .http
                .request(method.clone(), format!("{}{}", self.base_url, path))
                .header(header::CONTENT_TYPE, "application/json");
            if require_auth {
                if let Some(token) = &token {
                    request = request.bearer_auth(token);
                }
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Network(format!("Request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::Network(format!("Failed to read response: {}", e)))?;
                if bytes.is_empty() {
                    return Ok(Value::Null);
                }
                return serde_json::from_slice(&bytes).map_err(|e| GatewayError::Upstream {
                    status: status.as_u16(),
                    message: format!("Invalid JSON in response: {}", e),
                });
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if require_auth && !attempted_refresh {
                    attempted_refresh = true;
                    match self.refresh_after_reject(token.as_deref()).await {
                        Ok(_) => continue,
                        Err(e) => {
                            self.session.remove_auth_data();
                            return Err(e);
                        }
                    }
                }
                // Not retryable: clear local state and surface an auth error
                self.session.remove_auth_data();
                return Err(GatewayError::Auth("Authentication required".to_string()));
            }

            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text).unwrap_or_else(|| {
                if text.is_empty() {
                    format!("Request failed with status {}", status.as_u16())
                } else {
                    text.clone()
                }
            });
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
    }

    /// Single-flight refresh. `rejected_token` is the token the failed call
    /// used; a waiter queued behind an in-flight refresh will find the
    /// stored token already changed and reuse it.
    pub async fn refresh_after_reject(
        &self,
        rejected_token: Option<&str>,
    ) -> Result<String, GatewayError> {
        let _guard = self.refresh_gate.lock().await;

        if let Some(current) = self.session.token() {
            if rejected_token != Some(current.as_str()) {
                tracing::debug!("token already refreshed by a concurrent request, reusing");
                return Ok(current);
            }
        }

        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| GatewayError::Auth("No refresh token available".to_string()))?;

        match self.refresher.refresh(&refresh_token).await {
            Ok(auth) => {
                self.session
                    .set_auth_data(&auth)
                    .map_err(GatewayError::Auth)?;
                tracing::debug!("access token refreshed");
                Ok(auth.token)
            }
            Err(e) => {
                // Refresh failure is fatal for the session; never retried.
                tracing::warn!("token refresh failed: {}", e);
                self.session.remove_auth_data();
                Err(e)
            }
        }
    }
}
