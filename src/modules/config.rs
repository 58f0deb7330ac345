use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE: &str = "gateway_config.json";
const DATA_DIR: &str = ".smartbin-gateway";

/// Fallback host used when no upstream URL is configured anywhere.
pub const DEFAULT_UPSTREAM_URL: &str = "http://202.131.242.165:8080";

/// Gateway service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the device-management backend
    #[serde(default = "default_upstream_url")]
    pub upstream_base_url: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow LAN access
    /// - false: localhost only (default, privacy first)
    /// - true: bind 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Upstream request timeout (seconds), enforced on every outbound call
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Per-request debug logging
    #[serde(default)]
    pub enable_request_log: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: default_upstream_url(),
            port: default_port(),
            allow_lan_access: false,
            request_timeout: default_request_timeout(),
            enable_request_log: false,
        }
    }
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

impl GatewayConfig {
    /// Actual listen address derived from the LAN flag
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Parse and normalize the configured upstream base URL.
    /// The returned string never carries a trailing slash.
    pub fn normalized_upstream(&self) -> Result<String, String> {
        let url = Url::parse(&self.upstream_base_url)
            .map_err(|e| format!("Invalid upstream base URL '{}': {}", self.upstream_base_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "Unsupported upstream scheme '{}': expected http or https",
                url.scheme()
            ));
        }
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

/// Get data directory path
pub fn get_data_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Failed to get user home directory")?;
    let data_dir = home.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }

    Ok(data_dir)
}

/// Load gateway configuration
pub fn load_config() -> Result<GatewayConfig, String> {
    let data_dir = get_data_dir()?;
    let config_path = data_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        let config = GatewayConfig::default();
        let _ = save_config(&config);
        return Ok(config);
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Save gateway configuration
pub fn save_config(config: &GatewayConfig) -> Result<(), String> {
    let data_dir = get_data_dir()?;
    let config_path = data_dir.join(CONFIG_FILE);

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(&config_path, content).map_err(|e| format!("Failed to save config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_follows_lan_flag() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.get_bind_address(), "127.0.0.1");
        config.allow_lan_access = true;
        assert_eq!(config.get_bind_address(), "0.0.0.0");
    }

    #[test]
    fn upstream_url_is_normalized() {
        let config = GatewayConfig {
            upstream_base_url: "http://bins.example.com:8080/".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(
            config.normalized_upstream().unwrap(),
            "http://bins.example.com:8080"
        );
    }

    #[test]
    fn upstream_url_rejects_non_http_schemes() {
        let config = GatewayConfig {
            upstream_base_url: "ftp://bins.example.com".to_string(),
            ..GatewayConfig::default()
        };
        assert!(config.normalized_upstream().is_err());
    }

    #[test]
    fn default_config_points_at_fallback_host() {
        let config = GatewayConfig::default();
        assert_eq!(config.upstream_base_url, DEFAULT_UPSTREAM_URL);
        assert!(config.normalized_upstream().is_ok());
    }
}
