//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AppConfig, AppSettings, BinanceConfig, DatabaseConfig, ServerConfig, VaultConfig};
use crate::common::errors::{BridgeError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP__, e.g. APP__DATABASE__URL)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| BridgeError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| BridgeError::Configuration(e.to_string()))
}

/// Load configuration from plain environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let database = std::env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
        url,
        max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        connection_timeout_seconds: parse_var("DATABASE_TIMEOUT_SECONDS").unwrap_or(30),
    });

    let mut settings = AppSettings::default();
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        settings.log_level = level;
    }
    if let Some(timeout) = parse_var("REQUEST_TIMEOUT_SECONDS") {
        settings.request_timeout_seconds = timeout;
    }
    if let Ok(user) = std::env::var("DEFAULT_USER_ID") {
        settings.default_user_id = user;
    }

    Ok(AppConfig {
        server: ServerConfig {
            bind_addr: std::env::var("BRIDGE_BIND_ADDR")
                .unwrap_or_else(|_| ServerConfig::default().bind_addr),
        },
        binance: BinanceConfig {
            rest_url: std::env::var("BINANCE_REST_URL")
                .unwrap_or_else(|_| BinanceConfig::default().rest_url),
            recv_window_ms: parse_var("BINANCE_RECV_WINDOW_MS").unwrap_or(5000),
        },
        database,
        vault: VaultConfig {
            encryption_key: std::env::var("ENCRYPTION_KEY").ok(),
        },
        settings,
    })
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
