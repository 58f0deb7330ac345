use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get, on, post, MethodFilter},
    Router,
};
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::modules::config::GatewayConfig;
use crate::proxy::routes::ROUTES;
use crate::proxy::{handlers, middleware, UpstreamClient};

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub config: Arc<GatewayConfig>,
}

/// Build the full gateway router. Separate from `AxumServer::start` so tests
/// can drive it without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("web");

    let mut app = Router::new()
        // Sign-in / sign-out need cookie handling and field validation
        .route("/api/auth/signin", post(handlers::auth::signin))
        .route("/api/auth/signout", post(handlers::auth::signout))
        // Excel exports
        .route("/api/export/bins/excel", get(handlers::export::export_bins))
        .route("/api/export/cards/excel", get(handlers::export::export_cards))
        // Generic catch-all proxy
        .route("/api/proxy/*path", any(handlers::passthrough::proxy))
        .route("/healthz", get(health_check_handler))
        .route("/api/test", get(health_check_handler));

    // Dedicated resource routes, all served by the same parametrized handler
    for spec in ROUTES {
        let filter =
            MethodFilter::try_from(spec.method.clone()).expect("route table uses standard methods");
        app = app.route(
            spec.path,
            on(
                filter,
                move |State(state): State<AppState>,
                      Path(params): Path<HashMap<String, String>>,
                      RawQuery(query): RawQuery,
                      headers: HeaderMap,
                      body: Bytes| async move {
                    handlers::resource::forward(state, spec, params, query, headers, body).await
                },
            ),
        );
    }

    // The fallback must be attached before the layers so the access gate
    // also covers static navigation.
    let mut app = app
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(axum::middleware::from_fn(
            middleware::access_gate_middleware,
        ))
        .layer(middleware::cors_layer());

    if state.config.enable_request_log {
        app = app.layer(axum::middleware::from_fn(
            middleware::request_log_middleware,
        ));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AxumServer {
    /// Start the gateway server
    pub async fn start(
        host: String,
        port: u16,
        state: AppState,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let app = build_router(state);

        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;

        tracing::info!("Gateway server started at http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
        };

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling ended or error: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Gateway server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    /// Stop the server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}
