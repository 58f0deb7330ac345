use std::sync::Arc;

use smartbin_gateway::modules;
use smartbin_gateway::proxy;

#[tokio::main]
async fn main() -> Result<(), String> {
    modules::logger::init_logger();

    let mut config = match modules::config::load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("failed to load gateway config: {}. using defaults", err);
            let cfg = modules::config::GatewayConfig::default();
            let _ = modules::config::save_config(&cfg);
            cfg
        }
    };

    if let Ok(value) = std::env::var("SMARTBIN_UPSTREAM_URL") {
        if !value.trim().is_empty() {
            config.upstream_base_url = value;
        }
    }

    if let Ok(value) = std::env::var("SMARTBIN_PORT") {
        match value.parse::<u16>() {
            Ok(port) => config.port = port,
            Err(_) => tracing::warn!("ignoring invalid SMARTBIN_PORT value: {}", value),
        }
    }

    if let Ok(value) = std::env::var("SMARTBIN_ALLOW_LAN") {
        let enabled = matches!(value.as_str(), "1" | "true" | "yes" | "on");
        if enabled {
            config.allow_lan_access = true;
        }
    }

    let bind_address = if let Ok(addr) = std::env::var("SMARTBIN_BIND") {
        if addr != "127.0.0.1" && addr != "localhost" {
            config.allow_lan_access = true;
        }
        addr
    } else {
        config.get_bind_address().to_string()
    };

    let upstream_base = config.normalized_upstream()?;
    tracing::info!("forwarding to upstream at {}", upstream_base);

    let upstream = Arc::new(proxy::UpstreamClient::new(
        upstream_base,
        config.request_timeout,
    )?);

    let port = config.port;
    let state = proxy::AppState {
        upstream,
        config: Arc::new(config),
    };

    let (server, handle) = proxy::AxumServer::start(bind_address.clone(), port, state)
        .await
        .map_err(|e| format!("failed to start gateway server: {}", e))?;

    tracing::info!(
        "smartbin-gateway listening on http://{}:{}",
        bind_address,
        port
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    Ok(())
}
