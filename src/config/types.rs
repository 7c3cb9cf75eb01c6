//! Configuration types

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Binance connector configuration
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Database configuration (optional, in-memory stores otherwise)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Credential vault configuration
    #[serde(default)]
    pub vault: VaultConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. 0.0.0.0:8000
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Binance spot REST configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// Base URL for the spot REST API (point at the testnet for dry runs)
    #[serde(default = "default_binance_rest_url")]
    pub rest_url: String,
    /// recvWindow sent with signed requests, in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_url: default_binance_rest_url(),
            recv_window_ms: default_recv_window(),
        }
    }
}

fn default_binance_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

/// Database configuration for the persistent stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// Credential vault configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Base64-encoded 32-byte AES key; a random key is generated when unset
    #[serde(default)]
    pub encryption_key: Option<String>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout for exchange calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// User the admin API acts for when no user_id is given
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            default_user_id: default_user_id(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_id() -> String {
    "default".to_string()
}
